// Clap onset detector
// Three-state machine over the filtered motion signal with a refractory
// window to debounce noisy transitions

use serde::{Deserialize, Serialize};

use crate::motion::filter::MotionFrame;

/// Lower bound of the live-tunable sensitivity multiplier
pub const MIN_SENSITIVITY: f64 = 0.6;

/// Upper bound of the live-tunable sensitivity multiplier
pub const MAX_SENSITIVITY: f64 = 1.6;

/// Minimum interval between two emitted clap events, in milliseconds
pub const REFRACTORY_MS: f64 = 120.0;

/// Raw-distance ceiling for the fast-drop contact path, as a multiple
/// of the contact threshold
const FAST_DROP_CEILING: f64 = 1.2;

/// Detector phase over the hand-distance signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorState {
    /// Hands apart, or no usable signal yet
    Separate,

    /// Hands closing faster than the approach-velocity threshold
    Approaching,

    /// Hands within contact distance; a clap fired on entry
    Contact,
}

/// A detector-confirmed hand-contact instant
///
/// Instantaneous fact, not stored: consumed immediately by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClapEvent {
    pub timestamp_ms: f64,
}

/// Detector thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Smoothed velocity below which the hands count as closing,
    /// in pixels per frame
    pub approach_velocity: f64,

    /// Contact fires when smoothed distance drops under
    /// threshold x this margin
    pub contact_margin: f64,

    /// Hysteresis release: the state only returns to Separate once
    /// distance exceeds threshold x this margin
    pub separate_margin: f64,

    /// Frame-to-frame raw distance drop, in pixels, that counts as a
    /// fast clap even before the smoothed signal catches up
    pub fast_drop_px: f64,

    /// Minimum interval between emitted clap events, in milliseconds
    pub refractory_ms: f64,

    /// Sensitivity multiplier in [0.6, 1.6]; larger values raise the
    /// contact distance threshold, making detection more permissive
    pub sensitivity: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            approach_velocity: -0.4,
            contact_margin: 1.05,
            separate_margin: 1.25,
            fast_drop_px: 28.0,
            refractory_ms: REFRACTORY_MS,
            sensitivity: 1.0,
        }
    }
}

impl DetectorConfig {
    pub fn with_sensitivity(sensitivity: f64) -> Self {
        let mut config = DetectorConfig::default();
        config.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        config
    }
}

/// Turns the filtered motion signal into discrete, debounced clap events
///
/// Runs for the engine's lifetime; there is no terminal state. The
/// caller must [`reset`](OnsetDetector::reset) the detector whenever the
/// motion filter reports no signal.
#[derive(Debug)]
pub struct OnsetDetector {
    config: DetectorConfig,
    state: DetectorState,
    last_emitted_at: Option<f64>,
}

impl OnsetDetector {
    pub fn new(config: DetectorConfig) -> Self {
        OnsetDetector {
            config,
            state: DetectorState::Separate,
            last_emitted_at: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn sensitivity(&self) -> f64 {
        self.config.sensitivity
    }

    /// Adjust sensitivity live; the value is clamped to [0.6, 1.6]
    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.config.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
    }

    /// Hard reset to Separate after signal loss
    /// The refractory clock survives so jitter across a brief dropout
    /// cannot double-count a clap
    pub fn reset(&mut self) {
        self.state = DetectorState::Separate;
    }

    /// Full restart: state and refractory clock
    pub fn rearm(&mut self) {
        self.state = DetectorState::Separate;
        self.last_emitted_at = None;
    }

    /// Contact distance threshold for the current hand scale, in pixels
    pub fn contact_threshold(&self, hand_scale: f64) -> f64 {
        hand_scale * self.config.sensitivity
    }

    /// Advance the state machine by one filtered frame
    ///
    /// Emits at most one clap event, and none within the refractory
    /// window of the previous emission (the state still transitions).
    pub fn update(&mut self, motion: &MotionFrame, now_ms: f64) -> Option<ClapEvent> {
        let thr = self.contact_threshold(motion.hand_scale);
        let distance = motion.signal.distance;
        let velocity = motion.signal.velocity;

        match self.state {
            DetectorState::Separate => {
                if velocity < self.config.approach_velocity {
                    self.state = DetectorState::Approaching;
                }
                None
            }
            DetectorState::Approaching => {
                let contact_by_near = distance < thr * self.config.contact_margin;
                let contact_by_fast = motion.raw_drop > self.config.fast_drop_px
                    && motion.raw_distance < thr * FAST_DROP_CEILING;

                if contact_by_near || contact_by_fast {
                    self.state = DetectorState::Contact;
                    let clear = self
                        .last_emitted_at
                        .map_or(true, |t| now_ms - t > self.config.refractory_ms);
                    if clear {
                        self.last_emitted_at = Some(now_ms);
                        return Some(ClapEvent {
                            timestamp_ms: now_ms,
                        });
                    }
                    return None;
                }

                if velocity >= 0.0 && distance >= thr * self.config.separate_margin {
                    self.state = DetectorState::Separate;
                }
                None
            }
            DetectorState::Contact => {
                if distance > thr * self.config.separate_margin {
                    self.state = DetectorState::Separate;
                }
                None
            }
        }
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
