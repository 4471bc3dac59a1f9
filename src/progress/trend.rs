//! Per-field and overall trend classification.

use crate::angles::geometry::round_tenth;
use crate::comparison::MeasurementField;
use crate::models::{FieldTrend, MotionMeasurement, Trend};

pub fn classify(change: f64, threshold: f64) -> Trend {
    if change > threshold {
        Trend::Improving
    } else if change < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Compare the most recent value of `field` against the one before it.
///
/// `measurements` must be ordered oldest first.
pub fn field_trend(
    field: MeasurementField,
    measurements: &[MotionMeasurement],
    threshold: f64,
) -> FieldTrend {
    let mut values = measurements.iter().rev().filter_map(|m| m.value(field));
    let latest = values.next();
    let previous = values.next();

    match (latest, previous) {
        (Some(latest), Some(previous)) => {
            let change = latest - previous;
            let change_percentage = if previous == 0.0 {
                0.0
            } else {
                round_tenth(change / previous * 100.0)
            };
            FieldTrend {
                field,
                latest: Some(latest),
                previous: Some(previous),
                change_amount: round_tenth(change),
                change_percentage,
                trend: classify(change, threshold),
            }
        }
        (latest, _) => FieldTrend {
            latest,
            ..FieldTrend::stable(field)
        },
    }
}

/// One trend per field in declaration order. Fewer than two measurements means
/// there is nothing to compare and every field is stable.
pub fn field_trends(measurements: &[MotionMeasurement], threshold: f64) -> Vec<FieldTrend> {
    if measurements.len() < 2 {
        return MeasurementField::ALL
            .into_iter()
            .map(FieldTrend::stable)
            .collect();
    }

    MeasurementField::ALL
        .into_iter()
        .map(|field| field_trend(field, measurements, threshold))
        .collect()
}

/// A decline in a critical field dominates; otherwise the majority wins and a
/// tie is stable.
pub fn overall_trend(trends: &[FieldTrend]) -> Trend {
    if trends
        .iter()
        .any(|t| t.field.is_critical() && t.trend == Trend::Declining)
    {
        return Trend::Declining;
    }

    let improving = trends.iter().filter(|t| t.trend == Trend::Improving).count();
    let declining = trends.iter().filter(|t| t.trend == Trend::Declining).count();

    match improving.cmp(&declining) {
        std::cmp::Ordering::Greater => Trend::Improving,
        std::cmp::Ordering::Less => Trend::Declining,
        std::cmp::Ordering::Equal => Trend::Stable,
    }
}

/// Mean percentage change over fields that had something to compare.
pub fn overall_improvement(trends: &[FieldTrend]) -> f64 {
    let compared: Vec<f64> = trends
        .iter()
        .filter(|t| t.previous.is_some() && t.latest.is_some())
        .map(|t| t.change_percentage)
        .collect();

    if compared.is_empty() {
        0.0
    } else {
        round_tenth(compared.iter().sum::<f64>() / compared.len() as f64)
    }
}
