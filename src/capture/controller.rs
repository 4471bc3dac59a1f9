use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::angles::{measure, AngleResult, Motion};
use crate::comparison::NormalRangeTable;
use crate::error::CaptureError;
use crate::landmarks::{validator, HandFrame, Handedness};
use crate::models::{MeasurementResult, MeasurementSession, MotionMeasurement, SessionStatus};
use crate::settings::ClinicalConfig;
use crate::store::MeasurementStore;

use super::state::{SessionState, ThumbSnapshot};
use super::PhaseId;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const EVENT_CAPACITY: usize = 64;

/// Change notifications for whoever renders the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureEvent {
    #[serde(rename_all = "camelCase")]
    SessionStarted { session: MeasurementSession },
    #[serde(rename_all = "camelCase")]
    AngleRecorded {
        session_id: String,
        phase: PhaseId,
        reading: AngleResult,
    },
    #[serde(rename_all = "camelCase")]
    PhaseFinalized {
        session_id: String,
        result: MeasurementResult,
    },
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        session: MeasurementSession,
        measurement: MotionMeasurement,
    },
    #[serde(rename_all = "camelCase")]
    SessionCancelled { session: MeasurementSession },
    #[serde(rename_all = "camelCase")]
    PersistenceFailed { session_id: String, message: String },
}

/// Session slot: the current session plus whether its terminal state still
/// has to reach the store.
#[derive(Default)]
struct Slot {
    state: Option<SessionState>,
    unsaved: bool,
}

/// Drives one capture session at a time and writes finished sessions through
/// the injected store.
///
/// Frame handling, `advance`, `complete` and `cancel` all run under the same
/// session lock, so a frame pipeline never interleaves with a transition.
/// A completed or cancelled session whose write failed keeps the slot until
/// [`persist_completed`](Self::persist_completed) or
/// [`persist_cancelled`](Self::persist_cancelled) succeeds.
#[derive(Clone)]
pub struct CaptureController {
    slot: Arc<Mutex<Slot>>,
    store: Arc<dyn MeasurementStore>,
    clinical: Arc<ClinicalConfig>,
    ranges: Arc<NormalRangeTable>,
    events: broadcast::Sender<CaptureEvent>,
}

impl CaptureController {
    pub fn new(store: Arc<dyn MeasurementStore>, clinical: ClinicalConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let ranges = clinical.comparison_table();
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            store,
            clinical: Arc::new(clinical),
            ranges: Arc::new(ranges),
            events,
        }
    }

    pub fn clinical(&self) -> &ClinicalConfig {
        &self.clinical
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CaptureEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> Option<SessionState> {
        self.slot.lock().await.state.clone()
    }

    /// Whether the last completed or cancelled session still awaits a successful write.
    pub async fn has_unsaved_session(&self) -> bool {
        self.slot.lock().await.unsaved
    }

    pub async fn start_session(
        &self,
        user_id: &str,
        hand: Handedness,
    ) -> Result<MeasurementSession, CaptureError> {
        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.state.as_ref() {
            if existing.status() == SessionStatus::Active {
                return Err(CaptureError::SessionAlreadyActive(
                    existing.session.id.clone(),
                ));
            }
            if slot.unsaved {
                return Err(CaptureError::UnsavedSession {
                    session_id: existing.session.id.clone(),
                    status: existing.status(),
                });
            }
        }

        self.clinical.validate()?;
        let state = SessionState::begin(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            hand,
            self.clinical.phases.clone(),
            Utc::now(),
        )?;

        self.store
            .insert_session(&state.session)
            .await
            .map_err(CaptureError::Persistence)?;

        let session = state.session.clone();
        slot.state = Some(state);
        slot.unsaved = false;
        drop(slot);

        log_info!(
            "Started session {} for {} ({} hand, {} phases)",
            session.id,
            session.user_id,
            session.hand,
            session.total_phases
        );
        self.emit(CaptureEvent::SessionStarted {
            session: session.clone(),
        });

        Ok(session)
    }

    /// Run one detector callback through validation and the current phase's
    /// angle routine.
    ///
    /// `None`, a rejected frame, or an invalid angle leave the session untouched
    /// and return `Ok(None)`.
    pub async fn on_frame(
        &self,
        frame: Option<HandFrame>,
    ) -> Result<Option<AngleResult>, CaptureError> {
        let mut slot = self.slot.lock().await;
        let state = slot.state.as_mut().ok_or(CaptureError::NoActiveSession)?;

        let Some(frame) = frame else {
            return Ok(None);
        };
        if !validator::validate(&frame) {
            return Ok(None);
        }

        let Some(phase) = state.current_phase().map(|spec| spec.phase) else {
            if state.status() == SessionStatus::Active {
                return Ok(None);
            }
            return Err(CaptureError::SessionNotActive {
                session_id: state.session.id.clone(),
                status: state.status(),
            });
        };

        let now = Utc::now();
        let reading = measure(phase.motion(), &frame);
        if !state.record_angle(phase, reading, now)? {
            return Ok(None);
        }

        let flexion = measure(Motion::ThumbFlexion, &frame);
        let abduction = measure(Motion::ThumbAbduction, &frame);
        if flexion.is_valid && abduction.is_valid {
            state.record_thumb(ThumbSnapshot {
                flexion: flexion.angle,
                abduction: abduction.angle,
                accuracy: flexion.accuracy.min(abduction.accuracy),
            })?;
        }

        let session_id = state.session.id.clone();
        drop(slot);

        self.emit(CaptureEvent::AngleRecorded {
            session_id,
            phase,
            reading,
        });

        Ok(Some(reading))
    }

    /// Finalize the current phase and move to the next one.
    pub async fn advance(&self) -> Result<MeasurementResult, CaptureError> {
        let mut slot = self.slot.lock().await;
        let state = slot.state.as_mut().ok_or(CaptureError::NoActiveSession)?;
        let result = state.advance()?;
        let session_id = state.session.id.clone();
        drop(slot);

        log_info!(
            "Session {} finalized {} at {:.1}° ({:.1}% of target)",
            session_id,
            result.phase_id,
            result.angle_value,
            result.achievement
        );
        self.emit(CaptureEvent::PhaseFinalized {
            session_id,
            result: result.clone(),
        });

        Ok(result)
    }

    /// Close the session and persist it.
    ///
    /// On `CaptureError::Persistence` the session stays completed in memory and
    /// [`persist_completed`](Self::persist_completed) retries the write.
    pub async fn complete(&self) -> Result<MotionMeasurement, CaptureError> {
        {
            let mut slot = self.slot.lock().await;
            let state = slot.state.as_mut().ok_or(CaptureError::NoActiveSession)?;
            state.complete(Utc::now())?;
            log_info!(
                "Session {} completed with {} results",
                state.session.id,
                state.results.len()
            );
            slot.unsaved = true;
        }

        self.persist_completed().await
    }

    /// Write the completed session, its results and the day's measurement.
    /// Safe to repeat: results are keyed by phase and the measurement by day.
    pub async fn persist_completed(&self) -> Result<MotionMeasurement, CaptureError> {
        let (session, results, measurement) = {
            let slot = self.slot.lock().await;
            let state = terminal_state(&slot, SessionStatus::Completed)?;
            let measurement = state.build_measurement(&self.ranges)?;
            (state.session.clone(), state.results.clone(), measurement)
        };

        let stored = match self.write_completed(&session, &results, &measurement).await {
            Ok(stored) => stored,
            Err(err) => return Err(self.write_failed(&session, err)),
        };
        self.mark_saved(&session.id).await;

        self.emit(CaptureEvent::SessionCompleted {
            session,
            measurement: stored.clone(),
        });

        Ok(stored)
    }

    async fn write_completed(
        &self,
        session: &MeasurementSession,
        results: &[MeasurementResult],
        measurement: &MotionMeasurement,
    ) -> anyhow::Result<MotionMeasurement> {
        self.store.finish_session(session, results).await?;
        self.store.upsert_motion_measurement(measurement).await
    }

    /// Abandon the session and record the cancellation.
    ///
    /// On `CaptureError::Persistence` the session stays cancelled in memory and
    /// [`persist_cancelled`](Self::persist_cancelled) retries the write.
    pub async fn cancel(&self) -> Result<MeasurementSession, CaptureError> {
        {
            let mut slot = self.slot.lock().await;
            let state = slot.state.as_mut().ok_or(CaptureError::NoActiveSession)?;
            state.cancel(Utc::now())?;
            log_info!("Session {} cancelled", state.session.id);
            slot.unsaved = true;
        }

        self.persist_cancelled().await
    }

    /// Write the cancelled session's terminal status. Safe to repeat.
    pub async fn persist_cancelled(&self) -> Result<MeasurementSession, CaptureError> {
        let session = {
            let slot = self.slot.lock().await;
            terminal_state(&slot, SessionStatus::Cancelled)?.session.clone()
        };

        if let Err(err) = self.store.finish_session(&session, &[]).await {
            return Err(self.write_failed(&session, err));
        }
        self.mark_saved(&session.id).await;

        self.emit(CaptureEvent::SessionCancelled {
            session: session.clone(),
        });

        Ok(session)
    }

    fn write_failed(&self, session: &MeasurementSession, err: anyhow::Error) -> CaptureError {
        log_error!(
            "Failed to persist {} session {}: {:#}",
            session.status,
            session.id,
            err
        );
        self.emit(CaptureEvent::PersistenceFailed {
            session_id: session.id.clone(),
            message: format!("{err:#}"),
        });
        CaptureError::Persistence(err)
    }

    async fn mark_saved(&self, session_id: &str) {
        let mut slot = self.slot.lock().await;
        let same_session = slot
            .state
            .as_ref()
            .is_some_and(|state| state.session.id == session_id);
        if same_session {
            slot.unsaved = false;
        }
    }
}

fn terminal_state(slot: &Slot, expected: SessionStatus) -> Result<&SessionState, CaptureError> {
    let state = slot.state.as_ref().ok_or(CaptureError::NoActiveSession)?;
    match state.status() {
        SessionStatus::Active => Err(CaptureError::SessionAlreadyActive(
            state.session.id.clone(),
        )),
        status if status != expected => Err(CaptureError::UnexpectedStatus {
            session_id: state.session.id.clone(),
            status,
            expected,
        }),
        _ => Ok(state),
    }
}
