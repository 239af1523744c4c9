// Hand landmark data model
// Per-frame landmark sets as produced by an external hand-tracking backend

use serde::{Deserialize, Serialize};

/// Number of landmarks per detected hand (MediaPipe hand topology)
pub const LANDMARKS_PER_HAND: usize = 21;

/// Landmark index of the wrist point
pub const WRIST: usize = 0;

/// Landmark index of the middle-finger metacarpophalangeal joint
/// Together with the wrist it spans the palm
pub const MIDDLE_MCP: usize = 9;

/// A single landmark in normalized image coordinates [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        LandmarkPoint { x, y }
    }
}

/// One detected hand: an ordered, fixed-size set of normalized landmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hand {
    /// Landmarks indexed per the MediaPipe hand topology
    pub points: Vec<LandmarkPoint>,
}

impl Hand {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Hand { points }
    }

    /// Palm center in pixel space: midpoint of wrist and middle MCP
    /// Returns None if the landmark set is incomplete
    pub fn palm_px(&self, width_px: f64, height_px: f64) -> Option<(f64, f64)> {
        let a = self.points.get(WRIST)?;
        let b = self.points.get(MIDDLE_MCP)?;
        Some((
            ((a.x + b.x) / 2.0) * width_px,
            ((a.y + b.y) / 2.0) * height_px,
        ))
    }

    /// Hand size estimate in pixels: wrist to middle-MCP distance
    /// Used to make detection thresholds resolution and distance independent
    pub fn span_px(&self, width_px: f64, height_px: f64) -> Option<f64> {
        let a = self.points.get(WRIST)?;
        let b = self.points.get(MIDDLE_MCP)?;
        Some(((a.x - b.x) * width_px).hypot((a.y - b.y) * height_px))
    }
}

/// A single frame of hand detections: zero, one, or two hands
/// Ephemeral - produced once per camera frame and consumed immediately
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture timestamp in milliseconds on the engine clock
    pub timestamp_ms: f64,

    /// Source image width in pixels
    pub width_px: f64,

    /// Source image height in pixels
    pub height_px: f64,

    /// Detected hands, at most two
    pub hands: Vec<Hand>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ms: f64, width_px: f64, height_px: f64, hands: Vec<Hand>) -> Self {
        LandmarkFrame {
            timestamp_ms,
            width_px,
            height_px,
            hands,
        }
    }

    /// A frame with no detections
    pub fn empty(timestamp_ms: f64, width_px: f64, height_px: f64) -> Self {
        Self::new(timestamp_ms, width_px, height_px, Vec::new())
    }

    pub fn hand_count(&self) -> usize {
        self.hands.len()
    }
}
