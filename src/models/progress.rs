use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::comparison::MeasurementField;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AnalysisPeriod {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
}

impl AnalysisPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPeriod::Week => "week",
            AnalysisPeriod::Month => "month",
            AnalysisPeriod::ThreeMonths => "3months",
            AnalysisPeriod::SixMonths => "6months",
            AnalysisPeriod::Year => "year",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            AnalysisPeriod::Week => 7,
            AnalysisPeriod::Month => 30,
            AnalysisPeriod::ThreeMonths => 90,
            AnalysisPeriod::SixMonths => 180,
            AnalysisPeriod::Year => 365,
        }
    }
}

impl std::fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisPeriod {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "week" => Ok(AnalysisPeriod::Week),
            "month" => Ok(AnalysisPeriod::Month),
            "3months" => Ok(AnalysisPeriod::ThreeMonths),
            "6months" => Ok(AnalysisPeriod::SixMonths),
            "year" => Ok(AnalysisPeriod::Year),
            other => Err(anyhow::anyhow!("unknown analysis period {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldTrend {
    pub field: MeasurementField,
    pub latest: Option<f64>,
    pub previous: Option<f64>,
    pub change_amount: f64,
    pub change_percentage: f64,
    pub trend: Trend,
}

impl FieldTrend {
    pub fn stable(field: MeasurementField) -> Self {
        Self {
            field,
            latest: None,
            previous: None,
            change_amount: 0.0,
            change_percentage: 0.0,
            trend: Trend::Stable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldAverage {
    pub field: MeasurementField,
    pub average: f64,
    pub samples: u32,
}

/// Rollup over a fixed trailing window (7 or 30 days).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub measurement_count: u32,
    pub activity_count: u32,
    pub exercise_days: u32,
    pub total_exercise_minutes: u32,
    pub average_accuracy: f64,
    pub field_averages: Vec<FieldAverage>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataQualityLevel {
    #[default]
    Insufficient,
    Low,
    Fair,
    Good,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Bounded to [0, 1].
    pub score: f64,
    pub level: DataQualityLevel,
    pub measurement_count: u32,
    pub activity_count: u32,
    pub expected_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PredictedRecovery {
    pub estimated_days: Option<u32>,
    pub estimated_date: Option<NaiveDate>,
    /// Recovery percentage points gained per day across the window.
    pub daily_rate: f64,
}

/// Progress rollup for one user and analysis period.
///
/// Recomputed from history every time; a recalculation on the same day replaces
/// the earlier record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub id: String,
    pub user_id: String,
    pub analysis_period: AnalysisPeriod,
    pub calculated_on: NaiveDate,
    pub calculated_at: DateTime<Utc>,
    pub weekly_stats: PeriodStats,
    pub monthly_stats: PeriodStats,
    pub field_trends: Vec<FieldTrend>,
    pub overall_trend: Trend,
    pub overall_improvement: f64,
    pub improvement_rate: f64,
    pub average_angle: f64,
    pub recovery_rate: f64,
    pub predicted_recovery: PredictedRecovery,
    pub data_quality: DataQuality,
    pub created_at: DateTime<Utc>,
}

impl ProgressData {
    /// Well-formed rollup for a window with no usable history.
    pub fn empty(user_id: &str, period: AnalysisPeriod, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            analysis_period: period,
            calculated_on: now.date_naive(),
            calculated_at: now,
            weekly_stats: PeriodStats::default(),
            monthly_stats: PeriodStats::default(),
            field_trends: MeasurementField::ALL
                .into_iter()
                .map(FieldTrend::stable)
                .collect(),
            overall_trend: Trend::Stable,
            overall_improvement: 0.0,
            improvement_rate: 0.0,
            average_angle: 0.0,
            recovery_rate: 0.0,
            predicted_recovery: PredictedRecovery::default(),
            data_quality: DataQuality::default(),
            created_at: now,
        }
    }

    pub fn trend_for(&self, field: MeasurementField) -> Option<&FieldTrend> {
        self.field_trends.iter().find(|trend| trend.field == field)
    }

    /// Same-day recalculation: keeps identity and creation time of `self`.
    pub fn superseded_by(&self, newer: &ProgressData) -> ProgressData {
        ProgressData {
            id: self.id.clone(),
            created_at: self.created_at,
            ..newer.clone()
        }
    }
}
