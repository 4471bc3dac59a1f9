use serde::{Deserialize, Serialize};

use crate::landmarks::{
    HandFrame, INDEX_MCP, MIDDLE_MCP, PINKY_MCP, THUMB_CMC, THUMB_IP, THUMB_MCP, WRIST,
};

use super::geometry::{angle_between_vectors, fold_axis_angle, round_tenth, Vec3};

/// Output of one specialized angle measurement.
///
/// `accuracy` reflects how trustworthy the contributing landmarks were, not the
/// geometry. A degenerate or non-finite configuration yields `is_valid == false`
/// with a 0° sentinel angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleResult {
    pub angle: f64,
    pub accuracy: f64,
    pub is_valid: bool,
}

impl AngleResult {
    pub fn valid(angle: f64, accuracy: f64) -> Self {
        Self {
            angle,
            accuracy,
            is_valid: true,
        }
    }

    pub fn invalid(accuracy: f64) -> Self {
        Self {
            angle: 0.0,
            accuracy,
            is_valid: false,
        }
    }
}

/// A measured motion with a fixed landmark binding and anatomical output range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Motion {
    /// Wrist to middle-finger MCP against the vertical.
    WristFlexionExtension,
    /// Thumb-CMC to pinky-MCP axis against the horizontal.
    WristDeviation,
    /// Palm plane normal against the camera axis.
    ForearmRotation,
    ThumbFlexion,
    ThumbAbduction,
}

impl Motion {
    pub fn landmarks(&self) -> &'static [usize] {
        match self {
            Motion::WristFlexionExtension => &[WRIST, MIDDLE_MCP],
            Motion::WristDeviation => &[WRIST, THUMB_CMC, PINKY_MCP],
            Motion::ForearmRotation => &[WRIST, INDEX_MCP, PINKY_MCP],
            Motion::ThumbFlexion => &[THUMB_CMC, THUMB_MCP, THUMB_IP],
            Motion::ThumbAbduction => &[WRIST, THUMB_CMC, THUMB_MCP, INDEX_MCP],
        }
    }

    /// Upper bound of the anatomically valid output for this motion.
    pub fn max_angle(&self) -> f64 {
        match self {
            Motion::WristFlexionExtension => 90.0,
            Motion::WristDeviation => 45.0,
            Motion::ForearmRotation => 90.0,
            Motion::ThumbFlexion => 90.0,
            Motion::ThumbAbduction => 90.0,
        }
    }
}

fn point(frame: &HandFrame, index: usize) -> Option<Vec3> {
    frame
        .landmark(index)
        .filter(|landmark| landmark.is_finite())
        .map(Vec3::from)
}

/// Detector confidence scaled by the share of contributing points inside the image.
pub fn landmark_accuracy(frame: &HandFrame, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }

    let visible = indices
        .iter()
        .filter_map(|&index| frame.landmark(index))
        .filter(|landmark| landmark.is_finite() && landmark.in_view())
        .count();

    let confidence = if frame.confidence.is_finite() {
        frame.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    confidence * visible as f64 / indices.len() as f64
}

fn wrist_flexion_extension(frame: &HandFrame) -> Option<f64> {
    let wrist = point(frame, WRIST)?;
    let middle = point(frame, MIDDLE_MCP)?;
    angle_between_vectors(middle - wrist, Vec3::UP)
}

fn wrist_deviation(frame: &HandFrame) -> Option<f64> {
    let wrist = point(frame, WRIST)?;
    let thumb = point(frame, THUMB_CMC)? - wrist;
    let pinky = point(frame, PINKY_MCP)? - wrist;
    angle_between_vectors(pinky - thumb, Vec3::RIGHT).map(fold_axis_angle)
}

fn forearm_rotation(frame: &HandFrame) -> Option<f64> {
    let wrist = point(frame, WRIST)?;
    let index = point(frame, INDEX_MCP)? - wrist;
    let pinky = point(frame, PINKY_MCP)? - wrist;
    angle_between_vectors(index.cross(pinky), Vec3::TOWARD_CAMERA).map(fold_axis_angle)
}

fn thumb_flexion(frame: &HandFrame) -> Option<f64> {
    let cmc = point(frame, THUMB_CMC)?;
    let mcp = point(frame, THUMB_MCP)?;
    let ip = point(frame, THUMB_IP)?;
    angle_between_vectors(cmc - mcp, ip - mcp).map(|interior| 180.0 - interior)
}

fn thumb_abduction(frame: &HandFrame) -> Option<f64> {
    let wrist = point(frame, WRIST)?;
    let cmc = point(frame, THUMB_CMC)?;
    let mcp = point(frame, THUMB_MCP)?;
    let index = point(frame, INDEX_MCP)?;
    angle_between_vectors(mcp - cmc, index - wrist)
}

/// Measure one motion on a frame, clamped to the motion's anatomical range and
/// rounded to a tenth of a degree.
pub fn measure(motion: Motion, frame: &HandFrame) -> AngleResult {
    let accuracy = landmark_accuracy(frame, motion.landmarks());
    let raw = match motion {
        Motion::WristFlexionExtension => wrist_flexion_extension(frame),
        Motion::WristDeviation => wrist_deviation(frame),
        Motion::ForearmRotation => forearm_rotation(frame),
        Motion::ThumbFlexion => thumb_flexion(frame),
        Motion::ThumbAbduction => thumb_abduction(frame),
    };

    match raw {
        Some(angle) => AngleResult::valid(round_tenth(angle.clamp(0.0, motion.max_angle())), accuracy),
        None => AngleResult::invalid(accuracy),
    }
}
