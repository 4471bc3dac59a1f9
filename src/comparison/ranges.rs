use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The eight persisted angle fields, in declaration order.
///
/// Order matters: it breaks ties when picking the worst field of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementField {
    WristFlexion,
    WristExtension,
    WristUlnarDeviation,
    WristRadialDeviation,
    ThumbFlexion,
    ThumbExtension,
    ThumbAdduction,
    ThumbAbduction,
}

impl MeasurementField {
    pub const ALL: [MeasurementField; 8] = [
        MeasurementField::WristFlexion,
        MeasurementField::WristExtension,
        MeasurementField::WristUlnarDeviation,
        MeasurementField::WristRadialDeviation,
        MeasurementField::ThumbFlexion,
        MeasurementField::ThumbExtension,
        MeasurementField::ThumbAdduction,
        MeasurementField::ThumbAbduction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementField::WristFlexion => "wrist_flexion",
            MeasurementField::WristExtension => "wrist_extension",
            MeasurementField::WristUlnarDeviation => "wrist_ulnar_deviation",
            MeasurementField::WristRadialDeviation => "wrist_radial_deviation",
            MeasurementField::ThumbFlexion => "thumb_flexion",
            MeasurementField::ThumbExtension => "thumb_extension",
            MeasurementField::ThumbAdduction => "thumb_adduction",
            MeasurementField::ThumbAbduction => "thumb_abduction",
        }
    }

    /// Fields whose decline marks the whole progress trend as declining.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            MeasurementField::WristFlexion | MeasurementField::WristExtension
        )
    }
}

impl std::fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinically healthy range in degrees, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalRange {
    pub min: f64,
    pub max: f64,
}

impl NormalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f64) -> bool {
        self.min <= angle && angle <= self.max
    }
}

/// Normal range per field. Supplied through settings so clinical tables can change
/// without touching the comparison code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalRangeTable {
    ranges: BTreeMap<MeasurementField, NormalRange>,
}

impl NormalRangeTable {
    pub fn new(ranges: BTreeMap<MeasurementField, NormalRange>) -> Self {
        Self { ranges }
    }

    pub fn range(&self, field: MeasurementField) -> Option<NormalRange> {
        self.ranges.get(&field).copied()
    }

    pub fn with_range(mut self, field: MeasurementField, range: NormalRange) -> Self {
        self.ranges.insert(field, range);
        self
    }

    pub fn without(mut self, field: MeasurementField) -> Self {
        self.ranges.remove(&field);
        self
    }
}

impl Default for NormalRangeTable {
    fn default() -> Self {
        use MeasurementField::*;

        // Extension and adduction of the thumb are reference positions.
        let ranges = BTreeMap::from([
            (WristFlexion, NormalRange::new(0.0, 90.0)),
            (WristExtension, NormalRange::new(0.0, 70.0)),
            (WristUlnarDeviation, NormalRange::new(0.0, 55.0)),
            (WristRadialDeviation, NormalRange::new(0.0, 25.0)),
            (ThumbFlexion, NormalRange::new(0.0, 90.0)),
            (ThumbExtension, NormalRange::new(0.0, 0.0)),
            (ThumbAdduction, NormalRange::new(0.0, 0.0)),
            (ThumbAbduction, NormalRange::new(0.0, 60.0)),
        ]);
        Self { ranges }
    }
}
