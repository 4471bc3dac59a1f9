use serde::{Deserialize, Serialize};

/// Tuning knobs for the progress rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressConfig {
    /// Minimum change in degrees before a field counts as improving or declining.
    pub trend_threshold_degrees: f64,
    pub measurement_weight: f64,
    pub activity_weight: f64,
    /// Expected records per period are one per day, capped here.
    pub max_expected_records: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            trend_threshold_degrees: 2.0,
            measurement_weight: 0.7,
            activity_weight: 0.3,
            max_expected_records: 30,
        }
    }
}
