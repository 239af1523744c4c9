// Clap judging - matches claps to beats and classifies timing quality
// Adapts a latency-compensation offset as the run progresses

use serde::{Deserialize, Serialize};

use crate::motion::filter::ema;
use crate::timeline::{BeatTimeline, Verdict};

/// Absolute timing error, in milliseconds, within which a clap scores
/// Perfect
pub const PERFECT_MS: f64 = 220.0;

/// Absolute timing error, in milliseconds, within which a clap scores
/// Good; beyond it the clap is a Miss
pub const GOOD_MS: f64 = 500.0;

/// Aggressive pull toward the observed error after a Miss, so
/// accumulated latency drift is caught in one step
const MISS_PULL_ALPHA: f64 = 0.9;

/// Gentle pull applied after a Perfect or Good hit
const HIT_PULL_ALPHA: f64 = 0.25;

/// Judging windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub perfect_ms: f64,
    pub good_ms: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            perfect_ms: PERFECT_MS,
            good_ms: GOOD_MS,
        }
    }
}

/// Classify a signed timing error against the judging windows
pub fn classify(diff_ms: f64, config: &JudgeConfig) -> Verdict {
    let error = diff_ms.abs();
    if error <= config.perfect_ms {
        Verdict::Perfect
    } else if error <= config.good_ms {
        Verdict::Good
    } else {
        Verdict::Miss
    }
}

/// Outcome of judging one clap
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JudgedClap {
    pub beat_index: usize,
    pub verdict: Verdict,

    /// Signed timing error after any catch-up re-evaluation
    pub delta_ms: f64,
}

/// Matches each clap to the earliest unjudged beat and scores it
///
/// The effective offset is a persistent calibration baseline plus an
/// adaptive adjustment that tracks systemic latency drift during the
/// run. The adjustment update is asymmetric: a Miss pulls hard and the
/// clap is re-evaluated once with the updated offset, so a clap that
/// looked late only because of accumulated drift can still score; a hit
/// pulls gently to avoid destabilizing on one bad reading.
#[derive(Debug)]
pub struct Judge {
    config: JudgeConfig,
    baseline_ms: f64,
    adjustment_ms: f64,
}

impl Judge {
    pub fn new(config: JudgeConfig) -> Self {
        Judge {
            config,
            baseline_ms: 0.0,
            adjustment_ms: 0.0,
        }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Calibration baseline applied to all expected times
    pub fn baseline_ms(&self) -> f64 {
        self.baseline_ms
    }

    pub fn set_baseline_ms(&mut self, baseline_ms: f64) {
        self.baseline_ms = baseline_ms;
    }

    pub fn adjustment_ms(&self) -> f64 {
        self.adjustment_ms
    }

    /// Drop the adaptive adjustment at the start of a run
    pub fn reset_adjustment(&mut self) {
        self.adjustment_ms = 0.0;
    }

    /// Effective offset: calibration baseline plus adaptive adjustment
    pub fn offset_ms(&self) -> f64 {
        self.baseline_ms + self.adjustment_ms
    }

    /// Judge a clap at `timestamp_ms` against the earliest unjudged beat
    ///
    /// Returns None, with no state change, when every beat is already
    /// judged.
    pub fn on_clap(&mut self, timeline: &mut BeatTimeline, timestamp_ms: f64) -> Option<JudgedClap> {
        let index = timeline.first_unjudged()?;
        let expected_at = timeline.get(index)?.expected_at;

        let mut diff = timestamp_ms - (expected_at + self.offset_ms());
        let mut verdict = classify(diff, &self.config);

        if verdict == Verdict::Miss {
            self.adjustment_ms = ema(-diff, Some(self.adjustment_ms), MISS_PULL_ALPHA);
            diff = timestamp_ms - (expected_at + self.offset_ms());
            verdict = classify(diff, &self.config);
            log::debug!(
                "offset catch-up: adjustment now {:.1} ms, re-judged as {}",
                self.adjustment_ms,
                verdict.as_str()
            );
        } else {
            self.adjustment_ms = ema(-diff, Some(self.adjustment_ms), HIT_PULL_ALPHA);
        }

        if !timeline.record(index, timestamp_ms, diff, verdict, false) {
            return None;
        }

        Some(JudgedClap {
            beat_index: index,
            verdict,
            delta_ms: diff,
        })
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new(JudgeConfig::default())
    }
}
