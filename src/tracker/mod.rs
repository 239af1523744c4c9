// Hand tracking interface
// Narrow backend trait and landmark frame data model

pub mod landmarks;

pub use landmarks::{Hand, LandmarkFrame, LandmarkPoint, LANDMARKS_PER_HAND, MIDDLE_MCP, WRIST};

use thiserror::Error;

/// Errors produced by a hand-tracking backend
///
/// Initialization failures are fatal to session startup and must be
/// surfaced to the caller rather than silently retried.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker initialization failed: {0}")]
    Init(String),

    #[error("Landmark inference failed: {0}")]
    Inference(String),
}

/// A hand-tracking backend
///
/// The engine never depends on a specific tracker's shape; any backend
/// that can turn a raw camera frame into a [`LandmarkFrame`] plugs in
/// here. A skipped or dropped frame simply produces no detection update.
pub trait HandTracker {
    /// The backend's raw input frame type (camera image, video buffer, ...)
    type Frame;

    /// Run landmark inference on one frame captured at `timestamp_ms`
    fn detect(&mut self, frame: &Self::Frame, timestamp_ms: f64)
        -> Result<LandmarkFrame, TrackerError>;
}
