// Timeout sweeper - marks beats that were never clapped as missed
// Front-to-back scan with early stop; beats are time-ordered, so nothing
// after the first non-overdue beat can be overdue either

use serde::Serialize;

use crate::timeline::{BeatTimeline, Verdict};

/// Cadence of sweep passes while a run is active, in milliseconds
pub const SWEEP_INTERVAL_MS: f64 = 50.0;

/// Result of one sweep pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Indexes of beats this pass marked as missed
    pub newly_missed: Vec<usize>,

    /// True once every beat in the timeline is judged
    pub all_judged: bool,
}

impl SweepReport {
    pub fn changed(&self) -> bool {
        !self.newly_missed.is_empty()
    }
}

/// Periodically marks unjudged beats as missed once their judging window
/// has passed
///
/// Shares the timeline with the judge; both write through
/// [`BeatTimeline::record`], so a beat clapped between two sweeps can
/// never be written twice.
#[derive(Debug, Default)]
pub struct TimeoutSweeper {
    last_sweep_at: Option<f64>,
}

impl TimeoutSweeper {
    pub fn new() -> Self {
        TimeoutSweeper::default()
    }

    pub fn reset(&mut self) {
        self.last_sweep_at = None;
    }

    /// Whether the sweep cadence calls for a pass at `now_ms`
    pub fn due(&self, now_ms: f64) -> bool {
        self.last_sweep_at
            .map_or(true, |at| now_ms - at >= SWEEP_INTERVAL_MS)
    }

    /// Earliest time the next pass is due
    pub fn next_due(&self, now_ms: f64) -> f64 {
        self.last_sweep_at
            .map_or(now_ms, |at| at + SWEEP_INTERVAL_MS)
    }

    /// Mark every leading overdue beat as missed
    ///
    /// A beat is overdue once `now > expected_at + offset + miss_after`.
    /// Scanning stops at the first beat still inside its window.
    pub fn sweep(
        &mut self,
        timeline: &mut BeatTimeline,
        now_ms: f64,
        offset_ms: f64,
        miss_after_ms: f64,
    ) -> SweepReport {
        self.last_sweep_at = Some(now_ms);

        let mut report = SweepReport::default();
        for index in 0..timeline.len() {
            let beat = &timeline.beats()[index];
            if beat.is_judged() {
                continue;
            }

            let corrected = beat.expected_at + offset_ms;
            if now_ms > corrected + miss_after_ms {
                let delta = now_ms - corrected;
                if timeline.record(index, now_ms, delta, Verdict::Miss, true) {
                    report.newly_missed.push(index);
                }
            } else {
                break;
            }
        }

        report.all_judged = timeline.all_judged();
        report
    }
}
