use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::PhaseId;
use crate::landmarks::Handedness;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSession {
    pub id: String,
    pub user_id: String,
    pub hand: Handedness,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub total_phases: u32,
    pub completed_phases: u32,
}

/// Finalized outcome of one phase. Written once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResult {
    pub phase_id: PhaseId,
    pub angle_value: f64,
    pub target_angle: f64,
    /// Percent of target reached, capped at 100.
    pub achievement: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
    pub is_completed: bool,
}
