use super::{landmark_name, HandFrame, LANDMARK_COUNT, REQUIRED_LANDMARKS};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Structural check run before any angle math.
///
/// Returns `false` (never panics) when the frame is short or a required landmark
/// has a non-finite coordinate. A rejected frame simply produces no measurement.
pub fn validate(frame: &HandFrame) -> bool {
    if frame.landmarks.len() < LANDMARK_COUNT {
        log_debug!(
            "rejecting frame: {} landmarks, expected {}",
            frame.landmarks.len(),
            LANDMARK_COUNT
        );
        return false;
    }

    for &index in REQUIRED_LANDMARKS.iter() {
        if !frame.landmarks[index].is_finite() {
            log_debug!(
                "rejecting frame: landmark {} ({}) has a non-finite coordinate",
                index,
                landmark_name(index)
            );
            return false;
        }
    }

    true
}
