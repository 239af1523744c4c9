// Motion pipeline
// Palm-distance filtering and clap onset detection

pub mod detector;
pub mod filter;

pub use detector::{
    ClapEvent, DetectorConfig, DetectorState, OnsetDetector, MAX_SENSITIVITY, MIN_SENSITIVITY,
    REFRACTORY_MS,
};
pub use filter::{MotionFilter, MotionFrame, MotionSignal, PalmSample, PALM_HOLD_MS};

/// Synthetic landmark frames for exercising the detection pipeline
#[cfg(test)]
pub(crate) mod test_support {
    use crate::tracker::{Hand, LandmarkFrame, LandmarkPoint, LANDMARKS_PER_HAND, MIDDLE_MCP, WRIST};

    const W: f64 = 1000.0;
    const H: f64 = 1000.0;

    /// A hand whose palm center lands at (cx, cy) in pixels with a
    /// 100 px wrist-to-MCP span
    pub fn hand_at(cx: f64, cy: f64) -> Hand {
        let span = 100.0;
        let mut points = vec![LandmarkPoint::default(); LANDMARKS_PER_HAND];
        points[WRIST] = LandmarkPoint::new(cx / W, (cy - span / 2.0) / H);
        points[MIDDLE_MCP] = LandmarkPoint::new(cx / W, (cy + span / 2.0) / H);
        Hand::new(points)
    }

    /// A frame with two palms `gap_px` apart, centered on the image
    pub fn two_palm_frame(timestamp_ms: f64, gap_px: f64) -> LandmarkFrame {
        LandmarkFrame::new(
            timestamp_ms,
            W,
            H,
            vec![
                hand_at(500.0 - gap_px / 2.0, 500.0),
                hand_at(500.0 + gap_px / 2.0, 500.0),
            ],
        )
    }
}
