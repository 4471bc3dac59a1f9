pub mod controller;
pub mod phases;
pub mod state;

pub use controller::{CaptureController, CaptureEvent};
pub use phases::{achievement, PhaseId, PhaseSpec};
pub use state::{validate_phases, PhaseReading, SessionState, ThumbSnapshot};
