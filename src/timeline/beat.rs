// Beat log - scheduled beats and their judgment state
// Ordered by expected time; each beat is judged exactly once

use serde::{Deserialize, Serialize};

/// Timing quality of a judged beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Perfect,
    Good,
    Miss,
}

impl Verdict {
    /// String form used in event payloads and UI display
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Perfect => "Perfect",
            Verdict::Good => "Good",
            Verdict::Miss => "Miss",
        }
    }
}

/// One scheduled beat and, once judged, the clap that resolved it
///
/// `received_at`, `delta_ms`, and `verdict` are written together,
/// exactly once, by either the judge or the timeout sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beat {
    /// Scheduled instant the player is expected to clap, in milliseconds
    pub expected_at: f64,

    /// When a clap (or timeout) resolved this beat
    pub received_at: Option<f64>,

    /// Signed timing error against the offset-corrected expected time
    pub delta_ms: Option<f64>,

    pub verdict: Option<Verdict>,

    /// True when the timeout sweeper resolved this beat rather than a
    /// real clap; such beats carry no usable latency information
    pub timed_out: bool,
}

impl Beat {
    pub fn at(expected_at: f64) -> Self {
        Beat {
            expected_at,
            received_at: None,
            delta_ms: None,
            verdict: None,
            timed_out: false,
        }
    }

    pub fn is_judged(&self) -> bool {
        self.received_at.is_some()
    }
}

/// Per-run verdict counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictTally {
    pub perfect: usize,
    pub good: usize,
    pub miss: usize,
}

/// Ordered sequence of scheduled beats for one run
///
/// The expected times are non-decreasing at all times, including after a
/// mid-run tempo change. Both the judge and the sweeper mutate beats
/// through [`record`](BeatTimeline::record), which enforces
/// first-writer-wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatTimeline {
    beats: Vec<Beat>,
}

impl BeatTimeline {
    pub fn new(beats: Vec<Beat>) -> Self {
        debug_assert!(
            beats.windows(2).all(|w| w[0].expected_at <= w[1].expected_at),
            "beats must be ordered by expected time"
        );
        BeatTimeline { beats }
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub(crate) fn beats_mut(&mut self) -> &mut [Beat] {
        &mut self.beats
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Beat> {
        self.beats.get(index)
    }

    /// Index of the earliest beat with no recorded clap
    pub fn first_unjudged(&self) -> Option<usize> {
        self.beats.iter().position(|b| !b.is_judged())
    }

    /// Resolve a beat, first writer wins
    ///
    /// Returns false (and changes nothing) if the index is out of range
    /// or the beat was already judged.
    pub fn record(
        &mut self,
        index: usize,
        received_at: f64,
        delta_ms: f64,
        verdict: Verdict,
        timed_out: bool,
    ) -> bool {
        let Some(beat) = self.beats.get_mut(index) else {
            return false;
        };
        if beat.is_judged() {
            return false;
        }

        beat.received_at = Some(received_at);
        beat.delta_ms = Some(delta_ms);
        beat.verdict = Some(verdict);
        beat.timed_out = timed_out;
        true
    }

    pub fn judged_count(&self) -> usize {
        self.beats.iter().filter(|b| b.is_judged()).count()
    }

    pub fn all_judged(&self) -> bool {
        self.beats.iter().all(|b| b.is_judged())
    }

    /// Judged share of the run as a percentage [0, 100]
    pub fn progress_percent(&self) -> f32 {
        if self.beats.is_empty() {
            return 0.0;
        }
        (self.judged_count() as f32 / self.beats.len() as f32) * 100.0
    }

    pub fn tally(&self) -> VerdictTally {
        let mut tally = VerdictTally::default();
        for beat in &self.beats {
            match beat.verdict {
                Some(Verdict::Perfect) => tally.perfect += 1,
                Some(Verdict::Good) => tally.good += 1,
                Some(Verdict::Miss) => tally.miss += 1,
                None => {}
            }
        }
        tally
    }
}
