//! Per-day flattened snapshot of a completed session.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::comparison::{ComparisonResult, MeasurementField};
use crate::landmarks::Handedness;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MotionMeasurement {
    pub id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub measurement_date: NaiveDate,
    pub measured_at: DateTime<Utc>,
    pub hand_used: Handedness,
    pub wrist_flexion: Option<f64>,
    pub wrist_extension: Option<f64>,
    pub wrist_ulnar_deviation: Option<f64>,
    pub wrist_radial_deviation: Option<f64>,
    pub thumb_flexion: Option<f64>,
    pub thumb_extension: Option<f64>,
    pub thumb_adduction: Option<f64>,
    pub thumb_abduction: Option<f64>,
    /// Mean accuracy of the contributing readings, 0..1.
    pub accuracy_score: f64,
    pub comparison_result: ComparisonResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MotionMeasurement {
    pub fn value(&self, field: MeasurementField) -> Option<f64> {
        match field {
            MeasurementField::WristFlexion => self.wrist_flexion,
            MeasurementField::WristExtension => self.wrist_extension,
            MeasurementField::WristUlnarDeviation => self.wrist_ulnar_deviation,
            MeasurementField::WristRadialDeviation => self.wrist_radial_deviation,
            MeasurementField::ThumbFlexion => self.thumb_flexion,
            MeasurementField::ThumbExtension => self.thumb_extension,
            MeasurementField::ThumbAdduction => self.thumb_adduction,
            MeasurementField::ThumbAbduction => self.thumb_abduction,
        }
    }

    pub fn set_value(&mut self, field: MeasurementField, value: Option<f64>) {
        let slot = match field {
            MeasurementField::WristFlexion => &mut self.wrist_flexion,
            MeasurementField::WristExtension => &mut self.wrist_extension,
            MeasurementField::WristUlnarDeviation => &mut self.wrist_ulnar_deviation,
            MeasurementField::WristRadialDeviation => &mut self.wrist_radial_deviation,
            MeasurementField::ThumbFlexion => &mut self.thumb_flexion,
            MeasurementField::ThumbExtension => &mut self.thumb_extension,
            MeasurementField::ThumbAdduction => &mut self.thumb_adduction,
            MeasurementField::ThumbAbduction => &mut self.thumb_abduction,
        };
        *slot = value;
    }

    /// All eight fields in declaration order.
    pub fn field_values(&self) -> impl Iterator<Item = (MeasurementField, Option<f64>)> + '_ {
        MeasurementField::ALL
            .into_iter()
            .map(move |field| (field, self.value(field)))
    }

    /// Mean of the fields that carry a value, or `None` when all are empty.
    pub fn average_angle(&self) -> Option<f64> {
        let values: Vec<f64> = self.field_values().filter_map(|(_, value)| value).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Record that replaces `self` for the same user and day: identity and
    /// creation time stay, everything else comes from `newer`.
    pub fn superseded_by(&self, newer: &MotionMeasurement) -> MotionMeasurement {
        MotionMeasurement {
            id: self.id.clone(),
            created_at: self.created_at,
            ..newer.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{compare_fields, ComparisonStatus, NormalRangeTable};
    use chrono::TimeZone;

    fn sample(id: &str, flexion: f64, at: DateTime<Utc>) -> MotionMeasurement {
        let mut measurement = MotionMeasurement {
            id: id.into(),
            user_id: "user-1".into(),
            session_id: None,
            measurement_date: at.date_naive(),
            measured_at: at,
            hand_used: Handedness::Right,
            wrist_flexion: Some(flexion),
            wrist_extension: Some(50.0),
            wrist_ulnar_deviation: None,
            wrist_radial_deviation: None,
            thumb_flexion: None,
            thumb_extension: None,
            thumb_adduction: None,
            thumb_abduction: None,
            accuracy_score: 0.9,
            comparison_result: ComparisonResult {
                fields: Vec::new(),
                overall_status: ComparisonStatus::Normal,
            },
            created_at: at,
            updated_at: at,
        };
        measurement.comparison_result =
            compare_fields(measurement.field_values(), &NormalRangeTable::default());
        measurement
    }

    #[test]
    fn superseded_record_keeps_identity() {
        let morning = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
        let first = sample("first", 40.0, morning);
        let second = sample("second", 55.0, evening);

        let merged = first.superseded_by(&second);
        assert_eq!(merged.id, "first");
        assert_eq!(merged.created_at, morning);
        assert_eq!(merged.wrist_flexion, Some(55.0));
        assert_eq!(merged.updated_at, evening);
    }

    #[test]
    fn average_ignores_missing_fields() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let measurement = sample("m", 40.0, at);
        assert_eq!(measurement.average_angle(), Some(45.0));
    }
}
