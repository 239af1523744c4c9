// Engine events and run summary
// Everything the presentation layer needs, emitted through a closure
// sink; the engine itself never touches rendering or audio

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::calibration::CalibrationResult;
use crate::engine::core::GamePhase;
use crate::timeline::{BeatTimeline, Verdict};

/// Observer callback receiving engine events as they happen
pub type EventSink = Box<dyn FnMut(EngineEvent)>;

/// Events emitted by the engine for presentation and audio collaborators
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    PhaseChanged {
        phase: GamePhase,
    },

    /// A scheduled beat fired; cue the visual/haptic pulse
    Pulse {
        beat_index: usize,
    },

    /// Off-beat distraction cue (hardest level only)
    Distraction {
        beat_index: usize,
    },

    /// A debounced clap was detected during an active phase
    Clap {
        timestamp_ms: f64,
    },

    /// A clap was judged against a beat
    Verdict {
        beat_index: usize,
        verdict: Verdict,
        delta_ms: f64,
    },

    /// Judged share of the run changed
    Progress {
        percent: f32,
    },

    /// A mid-run tempo shift took effect
    TempoChanged {
        bpm: f64,
    },

    CalibrationDone {
        result: CalibrationResult,
    },

    RunFinished {
        summary: RunSummary,
    },
}

/// End-of-run score summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,

    pub perfect: usize,
    pub good: usize,
    pub miss: usize,

    /// Number of judged beats the composite score is computed over
    pub judged: usize,

    /// Composite accuracy: round(100 x (perfect + 0.7 x good) / judged)
    pub accuracy: u32,

    /// Reward tier [0, 3] derived from the accuracy score
    pub reward_tier: u8,

    /// Completion timestamp (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl RunSummary {
    /// Summarize a finished run's timeline
    pub fn from_timeline(run_id: Uuid, timeline: &BeatTimeline) -> Self {
        let tally = timeline.tally();
        let judged = timeline.judged_count();

        let accuracy = ((tally.perfect as f64 + 0.7 * tally.good as f64)
            / judged.max(1) as f64
            * 100.0)
            .round() as u32;

        RunSummary {
            run_id,
            perfect: tally.perfect,
            good: tally.good,
            miss: tally.miss,
            judged,
            accuracy,
            reward_tier: reward_tier(accuracy),
            completed_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// Reward tier for an accuracy score: three tiers from 40% upward
pub fn reward_tier(accuracy: u32) -> u8 {
    match accuracy {
        70.. => 3,
        55..=69 => 2,
        40..=54 => 1,
        _ => 0,
    }
}
