use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::angles::geometry::round_tenth;
use crate::comparison::{MeasurementField, NormalRangeTable};
use crate::models::{
    ActivityRecord, AnalysisPeriod, DataQuality, DataQualityLevel, FieldAverage,
    MotionMeasurement, PeriodStats, PredictedRecovery,
};

use super::config::ProgressConfig;

/// Rollup of whatever falls inside `[since, until]`.
pub fn period_stats(
    measurements: &[MotionMeasurement],
    activities: &[ActivityRecord],
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> PeriodStats {
    let in_range: Vec<&MotionMeasurement> = measurements
        .iter()
        .filter(|m| m.measured_at >= since && m.measured_at <= until)
        .collect();
    let first_day = since.date_naive();
    let last_day = until.date_naive();
    let logged: Vec<&ActivityRecord> = activities
        .iter()
        .filter(|a| a.activity_date >= first_day && a.activity_date <= last_day)
        .collect();

    let exercise_days: BTreeSet<NaiveDate> = logged
        .iter()
        .filter(|a| a.exercise_completed)
        .map(|a| a.activity_date)
        .collect();

    let average_accuracy = if in_range.is_empty() {
        0.0
    } else {
        in_range.iter().map(|m| m.accuracy_score).sum::<f64>() / in_range.len() as f64
    };

    let field_averages = MeasurementField::ALL
        .into_iter()
        .filter_map(|field| {
            let values: Vec<f64> = in_range.iter().filter_map(|m| m.value(field)).collect();
            if values.is_empty() {
                return None;
            }
            Some(FieldAverage {
                field,
                average: round_tenth(values.iter().sum::<f64>() / values.len() as f64),
                samples: values.len() as u32,
            })
        })
        .collect();

    PeriodStats {
        measurement_count: in_range.len() as u32,
        activity_count: logged.len() as u32,
        exercise_days: exercise_days.len() as u32,
        total_exercise_minutes: logged
            .iter()
            .filter(|a| a.exercise_completed)
            .map(|a| a.duration_minutes)
            .sum(),
        average_accuracy,
        field_averages,
    }
}

/// Mean share of the normal maximum reached by one measurement, in percent.
///
/// Fields whose normal maximum is zero are reference positions and carry no
/// recovery signal.
pub fn recovery_of(measurement: &MotionMeasurement, ranges: &NormalRangeTable) -> Option<f64> {
    let shares: Vec<f64> = measurement
        .field_values()
        .filter_map(|(field, value)| {
            let value = value?;
            let range = ranges.range(field)?;
            (range.max > 0.0).then(|| (value / range.max * 100.0).clamp(0.0, 100.0))
        })
        .collect();

    if shares.is_empty() {
        None
    } else {
        Some(shares.iter().sum::<f64>() / shares.len() as f64)
    }
}

/// Recovery of the most recent measurement that has a scorable field.
pub fn recovery_rate(measurements: &[MotionMeasurement], ranges: &NormalRangeTable) -> f64 {
    measurements
        .iter()
        .rev()
        .find_map(|m| recovery_of(m, ranges))
        .map(round_tenth)
        .unwrap_or(0.0)
}

/// Extrapolate the recovery slope between the first and last measurement of
/// the window to the day recovery reaches 100%.
pub fn predicted_recovery(
    measurements: &[MotionMeasurement],
    ranges: &NormalRangeTable,
    today: NaiveDate,
) -> PredictedRecovery {
    let scored: Vec<(DateTime<Utc>, f64)> = measurements
        .iter()
        .filter_map(|m| recovery_of(m, ranges).map(|r| (m.measured_at, r)))
        .collect();

    let (Some(&(first_at, first)), Some(&(last_at, last))) = (scored.first(), scored.last())
    else {
        return PredictedRecovery::default();
    };

    if last >= 100.0 {
        return PredictedRecovery {
            estimated_days: Some(0),
            estimated_date: Some(today),
            daily_rate: 0.0,
        };
    }

    let elapsed_days = (last_at - first_at).num_seconds() as f64 / 86_400.0;
    if scored.len() < 2 || elapsed_days <= 0.0 {
        return PredictedRecovery::default();
    }

    let daily_rate = (last - first) / elapsed_days;
    if daily_rate <= 0.0 {
        return PredictedRecovery {
            daily_rate: round_tenth(daily_rate),
            ..PredictedRecovery::default()
        };
    }

    // Tolerate float noise so an exact multiple of the rate is not pushed a day out.
    let days = ((100.0 - last) / daily_rate - 1e-9).ceil().max(0.0);
    let estimated_days = days.min(f64::from(u32::MAX)) as u32;
    PredictedRecovery {
        estimated_days: Some(estimated_days),
        estimated_date: today.checked_add_signed(Duration::days(i64::from(estimated_days))),
        daily_rate: round_tenth(daily_rate),
    }
}

/// Advisory completeness score: one measurement and one activity entry per day
/// of the period is full coverage.
pub fn data_quality(
    measurement_count: usize,
    activity_count: usize,
    period: AnalysisPeriod,
    config: &ProgressConfig,
) -> DataQuality {
    let expected = (period.days() as u32).min(config.max_expected_records).max(1);
    let coverage = |count: usize| (count as f64 / f64::from(expected)).min(1.0);

    let score = (config.measurement_weight * coverage(measurement_count)
        + config.activity_weight * coverage(activity_count))
    .clamp(0.0, 1.0);

    let level = if measurement_count == 0 {
        DataQualityLevel::Insufficient
    } else if score < 0.4 {
        DataQualityLevel::Low
    } else if score < 0.7 {
        DataQualityLevel::Fair
    } else {
        DataQualityLevel::Good
    };

    DataQuality {
        score: (score * 100.0).round() / 100.0,
        level,
        measurement_count: measurement_count as u32,
        activity_count: activity_count as u32,
        expected_count: expected,
    }
}
