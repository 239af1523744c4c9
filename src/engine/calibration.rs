// Latency calibration
// Short fixed-tempo run that estimates the player's baseline system
// latency from the median clap-to-beat delta

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::timeline::BeatTimeline;

/// Tempo of the calibration sequence
pub const CALIBRATION_BPM: f64 = 59.0;

/// Length of the calibration sequence
pub const CALIBRATION_BEATS: usize = 5;

/// Extra settle time past the Good window after the last calibration
/// beat, so the final beat can age out before the baseline is computed
pub const SETTLE_EXTRA_MS: f64 = 80.0;

/// Baseline used when a calibration run records no genuine clap
pub const DEFAULT_BASELINE_MS: f64 = 300.0;

/// Estimated baseline latency from one calibration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Median observed clap delay, applied to all future expected times
    pub offset_ms: f64,

    /// Number of genuine claps the median was computed over; zero means
    /// the default baseline was used
    pub sampled_beats: usize,

    /// When the calibration completed (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<String>,
}

impl CalibrationResult {
    pub fn new(offset_ms: f64, sampled_beats: usize) -> Self {
        CalibrationResult {
            offset_ms,
            sampled_beats,
            recorded_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// Compute the baseline offset from a finished calibration timeline
///
/// Only beats resolved by a real clap contribute; beats the timeout
/// sweeper marked carry sweep time rather than clap time and would drag
/// the median toward the miss deadline. With no genuine claps at all
/// the baseline falls back to [`DEFAULT_BASELINE_MS`].
pub fn baseline_offset(timeline: &BeatTimeline) -> CalibrationResult {
    let deltas: Vec<f64> = timeline
        .beats()
        .iter()
        .filter(|beat| !beat.timed_out)
        .filter_map(|beat| beat.received_at.map(|at| at - beat.expected_at))
        .collect();

    if deltas.is_empty() {
        CalibrationResult::new(DEFAULT_BASELINE_MS, 0)
    } else {
        CalibrationResult::new(median(&deltas), deltas.len())
    }
}

/// Median of a non-empty slice; mean of the middle pair for even lengths
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Beat, Verdict};

    fn calibration_timeline() -> BeatTimeline {
        BeatTimeline::new((0..5).map(|i| Beat::at(1000.0 + i as f64 * 1000.0)).collect())
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn test_baseline_is_median_of_clap_deltas() {
        let mut timeline = calibration_timeline();
        timeline.record(0, 1150.0, 150.0, Verdict::Perfect, false);
        timeline.record(1, 2180.0, 180.0, Verdict::Perfect, false);
        timeline.record(2, 3210.0, 210.0, Verdict::Perfect, false);

        let result = baseline_offset(&timeline);
        assert_eq!(result.offset_ms, 180.0);
        assert_eq!(result.sampled_beats, 3);
    }

    #[test]
    fn test_timed_out_beats_are_excluded() {
        let mut timeline = calibration_timeline();
        timeline.record(0, 1160.0, 160.0, Verdict::Perfect, false);
        timeline.record(1, 2160.0, 160.0, Verdict::Perfect, false);
        // Sweeper resolutions: received_at is sweep time, far past the beat
        timeline.record(2, 3520.0, 520.0, Verdict::Miss, true);
        timeline.record(3, 4520.0, 520.0, Verdict::Miss, true);
        timeline.record(4, 5520.0, 520.0, Verdict::Miss, true);

        let result = baseline_offset(&timeline);
        assert_eq!(result.offset_ms, 160.0);
        assert_eq!(result.sampled_beats, 2);
    }

    #[test]
    fn test_no_claps_falls_back_to_default() {
        let mut timeline = calibration_timeline();
        for i in 0..5 {
            timeline.record(i, 9000.0, 500.0, Verdict::Miss, true);
        }

        let result = baseline_offset(&timeline);
        assert_eq!(result.offset_ms, DEFAULT_BASELINE_MS);
        assert_eq!(result.sampled_beats, 0);
    }

    #[test]
    fn test_empty_timeline_falls_back_to_default() {
        let result = baseline_offset(&BeatTimeline::default());
        assert_eq!(result.offset_ms, DEFAULT_BASELINE_MS);
        assert_eq!(result.sampled_beats, 0);
    }
}
