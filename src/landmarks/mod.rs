//! Hand landmark types as emitted by the external detector.
//!
//! Index constants follow the 21-point hand skeleton convention: the wrist is
//! point 0, each finger contributes four points from base to tip.

pub mod validator;

pub use validator::validate;

use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Landmarks every wrist measurement depends on.
pub const REQUIRED_LANDMARKS: [usize; 5] = [WRIST, THUMB_CMC, INDEX_MCP, MIDDLE_MCP, PINKY_MCP];

pub fn landmark_name(index: usize) -> &'static str {
    match index {
        WRIST => "wrist",
        THUMB_CMC => "thumb_cmc",
        THUMB_MCP => "thumb_mcp",
        THUMB_IP => "thumb_ip",
        THUMB_TIP => "thumb_tip",
        INDEX_MCP => "index_mcp",
        INDEX_PIP => "index_pip",
        INDEX_DIP => "index_dip",
        INDEX_TIP => "index_tip",
        MIDDLE_MCP => "middle_mcp",
        MIDDLE_PIP => "middle_pip",
        MIDDLE_DIP => "middle_dip",
        MIDDLE_TIP => "middle_tip",
        RING_MCP => "ring_mcp",
        RING_PIP => "ring_pip",
        RING_DIP => "ring_dip",
        RING_TIP => "ring_tip",
        PINKY_MCP => "pinky_mcp",
        PINKY_PIP => "pinky_pip",
        PINKY_DIP => "pinky_dip",
        PINKY_TIP => "pinky_tip",
        _ => "unknown",
    }
}

/// A single point in normalized camera space (x and y in image fractions, z relative depth).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Whether the point projects inside the camera image.
    pub fn in_view(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Handedness {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "left" => Ok(Handedness::Left),
            "right" => Ok(Handedness::Right),
            other => Err(anyhow::anyhow!("unknown handedness {other}")),
        }
    }
}

/// One detector callback worth of landmarks. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandFrame {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    pub confidence: f64,
}

impl HandFrame {
    pub fn new(landmarks: Vec<Landmark>, handedness: Handedness, confidence: f64) -> Self {
        Self {
            landmarks,
            handedness,
            confidence,
        }
    }

    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic right-hand poses: palm facing the camera, fingers pointing up.

    use super::*;

    pub fn neutral_frame() -> HandFrame {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = Landmark::new(0.5, 0.8, 0.0);
        points[THUMB_CMC] = Landmark::new(0.42, 0.72, 0.0);
        points[THUMB_MCP] = Landmark::new(0.38, 0.66, 0.0);
        points[THUMB_IP] = Landmark::new(0.34, 0.60, 0.0);
        points[THUMB_TIP] = Landmark::new(0.30, 0.54, 0.0);
        points[INDEX_MCP] = Landmark::new(0.45, 0.62, 0.0);
        points[INDEX_PIP] = Landmark::new(0.45, 0.54, 0.0);
        points[INDEX_DIP] = Landmark::new(0.45, 0.49, 0.0);
        points[INDEX_TIP] = Landmark::new(0.45, 0.45, 0.0);
        points[MIDDLE_MCP] = Landmark::new(0.5, 0.6, 0.0);
        points[MIDDLE_PIP] = Landmark::new(0.5, 0.52, 0.0);
        points[MIDDLE_DIP] = Landmark::new(0.5, 0.47, 0.0);
        points[MIDDLE_TIP] = Landmark::new(0.5, 0.43, 0.0);
        points[RING_MCP] = Landmark::new(0.545, 0.64, 0.0);
        points[RING_PIP] = Landmark::new(0.545, 0.56, 0.0);
        points[RING_DIP] = Landmark::new(0.545, 0.51, 0.0);
        points[RING_TIP] = Landmark::new(0.545, 0.47, 0.0);
        points[PINKY_MCP] = Landmark::new(0.58, 0.72, 0.0);
        points[PINKY_PIP] = Landmark::new(0.58, 0.66, 0.0);
        points[PINKY_DIP] = Landmark::new(0.58, 0.62, 0.0);
        points[PINKY_TIP] = Landmark::new(0.58, 0.59, 0.0);
        HandFrame::new(points.to_vec(), Handedness::Right, 0.95)
    }

    /// Middle-finger MCP tipped toward the camera by `degrees` around the wrist.
    pub fn flexed_frame(degrees: f64) -> HandFrame {
        let mut frame = neutral_frame();
        let wrist = frame.landmarks[WRIST];
        let theta = degrees.to_radians();
        frame.landmarks[MIDDLE_MCP] = Landmark::new(
            wrist.x,
            wrist.y - 0.2 * theta.cos(),
            wrist.z - 0.2 * theta.sin(),
        );
        frame
    }

    /// Pinky MCP swung upward so the thumb-pinky axis tilts by `degrees`.
    pub fn deviated_frame(degrees: f64) -> HandFrame {
        let mut frame = neutral_frame();
        let thumb = frame.landmarks[THUMB_CMC];
        let theta = degrees.to_radians();
        frame.landmarks[PINKY_MCP] = Landmark::new(
            thumb.x + 0.16 * theta.cos(),
            thumb.y - 0.16 * theta.sin(),
            thumb.z,
        );
        frame
    }

    /// Whole hand turned about the vertical axis through the wrist.
    pub fn rotated_frame(degrees: f64) -> HandFrame {
        let mut frame = neutral_frame();
        let wrist = frame.landmarks[WRIST];
        let (sin, cos) = degrees.to_radians().sin_cos();
        for point in frame.landmarks.iter_mut() {
            let dx = point.x - wrist.x;
            let dz = point.z - wrist.z;
            point.x = wrist.x + dx * cos + dz * sin;
            point.z = wrist.z - dx * sin + dz * cos;
        }
        frame
    }
}
