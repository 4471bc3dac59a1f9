use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One calendar entry of the home exercise log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub user_id: String,
    pub activity_date: NaiveDate,
    pub exercise_completed: bool,
    pub duration_minutes: u32,
    /// Self-reported pain on a 0-10 scale.
    pub pain_level: Option<u8>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
