//! Scripted sessions: feed recorded detector output through the controller
//! and report the resulting measurement and progress.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureController, PhaseId};
use crate::landmarks::{HandFrame, Handedness};
use crate::models::{ActivityRecord, AnalysisPeriod, MotionMeasurement, ProgressData};
use crate::progress::ProgressTracker;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
    pub phase: PhaseId,
    /// `null` entries stand for callbacks where no hand was detected.
    pub frames: Vec<Option<HandFrame>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayActivity {
    pub activity_date: NaiveDate,
    pub exercise_completed: bool,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub pain_level: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    pub user_id: String,
    pub hand: Handedness,
    #[serde(default = "default_period")]
    pub period: AnalysisPeriod,
    pub steps: Vec<ReplayStep>,
    #[serde(default)]
    pub activities: Vec<ReplayActivity>,
}

fn default_period() -> AnalysisPeriod {
    AnalysisPeriod::Month
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    pub measurement: MotionMeasurement,
    pub progress: ProgressData,
}

impl ReplayScript {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("failed to parse replay script")
    }
}

pub async fn replay(
    controller: &CaptureController,
    tracker: &ProgressTracker,
    script: &ReplayScript,
) -> Result<ReplayOutcome> {
    let session = controller.start_session(&script.user_id, script.hand).await?;

    for step in &script.steps {
        let current = controller
            .snapshot()
            .await
            .and_then(|state| state.current_phase().map(|spec| spec.phase));
        if current != Some(step.phase) {
            controller.cancel().await?;
            bail!(
                "script step {} does not match the session's current phase {:?}",
                step.phase,
                current
            );
        }

        let mut recorded = 0usize;
        for frame in &step.frames {
            if controller.on_frame(frame.clone()).await?.is_some() {
                recorded += 1;
            }
        }
        if recorded == 0 {
            log_warn!(
                "No usable frames for {} in session {}",
                step.phase,
                session.id
            );
        }

        controller.advance().await?;
    }

    let measurement = controller.complete().await?;

    for activity in &script.activities {
        tracker
            .log_activity(&ActivityRecord {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: script.user_id.clone(),
                activity_date: activity.activity_date,
                exercise_completed: activity.exercise_completed,
                duration_minutes: activity.duration_minutes,
                pain_level: activity.pain_level,
                notes: activity.notes.clone(),
                created_at: Utc::now(),
            })
            .await?;
    }

    let progress = tracker
        .recalculate(&script.user_id, script.period, Utc::now())
        .await?;

    Ok(ReplayOutcome {
        measurement,
        progress,
    })
}
