use thiserror::Error;

use crate::capture::PhaseId;
use crate::models::SessionStatus;

/// Errors surfaced by the capture state machine and its controller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no measurement session is active")]
    NoActiveSession,

    #[error("session {session_id} is {status}, not active")]
    SessionNotActive {
        session_id: String,
        status: SessionStatus,
    },

    #[error("session {0} is still active")]
    SessionAlreadyActive(String),

    #[error("session {session_id} is {status} but has not been saved; retry the write first")]
    UnsavedSession {
        session_id: String,
        status: SessionStatus,
    },

    #[error("session {session_id} is {status}, expected {expected}")]
    UnexpectedStatus {
        session_id: String,
        status: SessionStatus,
        expected: SessionStatus,
    },

    #[error("phase {requested} is not the current phase ({current:?})")]
    PhaseMismatch {
        requested: PhaseId,
        current: Option<PhaseId>,
    },

    #[error("every phase is already finalized; complete the session")]
    AllPhasesFinalized,

    #[error("phase {0} has no recorded angle")]
    NoReading(PhaseId),

    #[error("session is incomplete; missing phases: {}", format_phases(.missing))]
    IncompleteSession { missing: Vec<PhaseId> },

    #[error("invalid clinical configuration: {0}")]
    InvalidConfig(String),

    #[error("persistence failed: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

fn format_phases(phases: &[PhaseId]) -> String {
    phases
        .iter()
        .map(PhaseId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CaptureError {
    /// Ordering bugs upstream: the caller drove the session out of sequence.
    pub fn is_session_state(&self) -> bool {
        matches!(
            self,
            CaptureError::NoActiveSession
                | CaptureError::SessionNotActive { .. }
                | CaptureError::SessionAlreadyActive(_)
                | CaptureError::UnsavedSession { .. }
                | CaptureError::UnexpectedStatus { .. }
                | CaptureError::PhaseMismatch { .. }
                | CaptureError::AllPhasesFinalized
                | CaptureError::NoReading(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::Persistence(_))
    }
}
