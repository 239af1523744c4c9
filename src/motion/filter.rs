// Motion filter - smooths the raw two-palm distance signal
// Exponential moving averages over inter-palm distance, closing velocity,
// and a long-window hand-scale estimate

use serde::{Deserialize, Serialize};

use crate::tracker::LandmarkFrame;

/// How long a vanished palm's last-known position keeps substituting
/// for a live detection, to tolerate brief occlusion
pub const PALM_HOLD_MS: f64 = 300.0;

/// Smoothing factor for the inter-palm distance EMA
const EMA_DIST_ALPHA: f64 = 0.6;

/// Smoothing factor for the closing-velocity EMA
const EMA_VEL_ALPHA: f64 = 0.7;

/// Smoothing factor for the long-window hand-scale EMA
const HAND_SCALE_ALPHA: f64 = 0.1;

/// Hand-scale estimate before any hand has been measured, in pixels
const INITIAL_HAND_SCALE_PX: f64 = 120.0;

/// Exponential moving average step
/// With no previous value the new sample passes through unchanged
pub(crate) fn ema(current: f64, previous: Option<f64>, alpha: f64) -> f64 {
    match previous {
        Some(prev) => prev * (1.0 - alpha) + current * alpha,
        None => current,
    }
}

/// Last-known palm position, held for up to [`PALM_HOLD_MS`] after the
/// hand vanishes
#[derive(Debug, Clone, Copy)]
pub struct PalmSample {
    pub x: f64,
    pub y: f64,
    pub captured_at_ms: f64,
}

/// Smoothed distance/velocity estimate for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSignal {
    /// EMA-smoothed inter-palm distance in pixels
    pub distance: f64,

    /// EMA-smoothed frame-to-frame change in smoothed distance
    /// Negative while the hands are closing
    pub velocity: f64,
}

/// Full per-frame filter output consumed by the onset detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionFrame {
    pub signal: MotionSignal,

    /// Unsmoothed inter-palm distance for this frame
    pub raw_distance: f64,

    /// Absolute frame-to-frame change in raw distance
    /// Catches fast claps the smoothed signal lags behind
    pub raw_drop: f64,

    /// Long-window average hand size in pixels
    pub hand_scale: f64,
}

/// Smooths the raw two-hand distance signal into a stable
/// distance/velocity estimate
///
/// Reports no signal whenever fewer than two palms are available, even
/// after the hold window; the caller must treat that as a hard reset of
/// the onset detector.
#[derive(Debug)]
pub struct MotionFilter {
    smoothed_distance: Option<f64>,
    smoothed_velocity: f64,
    prev_raw_distance: Option<f64>,
    hand_scale: f64,
    held: [Option<PalmSample>; 2],
}

impl MotionFilter {
    pub fn new() -> Self {
        MotionFilter {
            smoothed_distance: None,
            smoothed_velocity: 0.0,
            prev_raw_distance: None,
            hand_scale: INITIAL_HAND_SCALE_PX,
            held: [None, None],
        }
    }

    /// Current long-window hand-scale estimate in pixels
    pub fn hand_scale(&self) -> f64 {
        self.hand_scale
    }

    /// Full reset: signal history, held palms, and hand scale
    /// Used when the detection pipeline restarts (e.g. sensitivity change)
    pub fn reset(&mut self) {
        *self = MotionFilter::new();
    }

    /// Drop the smoothed signal without touching held palms or hand scale
    /// Held palms expire on their own via the hold window
    fn clear_signal(&mut self) {
        self.smoothed_distance = None;
        self.smoothed_velocity = 0.0;
        self.prev_raw_distance = None;
    }

    /// Process one landmark frame
    ///
    /// Returns None when fewer than two palms are available (live or
    /// held); the signal history is cleared so the next two-hand frame
    /// starts fresh.
    pub fn update(&mut self, frame: &LandmarkFrame) -> Option<MotionFrame> {
        let now = frame.timestamp_ms;
        let (w, h) = (frame.width_px, frame.height_px);

        let mut live: Vec<(f64, f64)> = Vec::with_capacity(2);
        for (slot, hand) in frame.hands.iter().take(2).enumerate() {
            if let Some(palm) = hand.palm_px(w, h) {
                live.push(palm);
                self.held[slot] = Some(PalmSample {
                    x: palm.0,
                    y: palm.1,
                    captured_at_ms: now,
                });
            }
        }

        let pair = if live.len() >= 2 {
            Some([live[0], live[1]])
        } else {
            match (self.held[0], self.held[1]) {
                (Some(a), Some(b))
                    if now - a.captured_at_ms < PALM_HOLD_MS
                        && now - b.captured_at_ms < PALM_HOLD_MS =>
                {
                    Some([(a.x, a.y), (b.x, b.y)])
                }
                _ => None,
            }
        };

        let [p1, p2] = match pair {
            Some(pair) => pair,
            None => {
                self.clear_signal();
                return None;
            }
        };

        // Hand scale only updates from frames with two live detections;
        // held positions carry no size information
        if frame.hands.len() >= 2 {
            if let (Some(s1), Some(s2)) =
                (frame.hands[0].span_px(w, h), frame.hands[1].span_px(w, h))
            {
                let span = (s1 + s2) / 2.0;
                if span > 0.0 {
                    self.hand_scale = ema(span, Some(self.hand_scale), HAND_SCALE_ALPHA);
                }
            }
        }

        let raw = (p1.0 - p2.0).hypot(p1.1 - p2.1);
        let smoothed = ema(raw, self.smoothed_distance, EMA_DIST_ALPHA);
        let raw_velocity = match self.smoothed_distance {
            Some(prev) => smoothed - prev,
            None => 0.0,
        };
        let velocity = ema(raw_velocity, Some(self.smoothed_velocity), EMA_VEL_ALPHA);
        let raw_drop = match self.prev_raw_distance {
            Some(prev) => (raw - prev).abs(),
            None => 0.0,
        };

        self.smoothed_distance = Some(smoothed);
        self.smoothed_velocity = velocity;
        self.prev_raw_distance = Some(raw);

        Some(MotionFrame {
            signal: MotionSignal {
                distance: smoothed,
                velocity,
            },
            raw_distance: raw,
            raw_drop,
            hand_scale: self.hand_scale,
        })
    }
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new()
    }
}
