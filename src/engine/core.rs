// Clap engine - owns the detection pipeline, timeline, and judging state
// Synchronous and time-explicit: feed_frame delivers sensor input,
// tick(now) drives everything scheduled

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::calibration::{
    baseline_offset, CALIBRATION_BEATS, CALIBRATION_BPM, SETTLE_EXTRA_MS,
};
use crate::engine::config::{LevelSettings, TempoShift};
use crate::engine::events::{EngineEvent, EventSink, RunSummary};
use crate::judge::{Judge, SweepReport, TimeoutSweeper};
use crate::motion::{ClapEvent, MotionFilter, OnsetDetector};
use crate::timeline::{retime, schedule, BeatTimeline};
use crate::tracker::LandmarkFrame;

/// Delay between the last judged beat and the transition to Finished,
/// so the final verdict feedback lands before the summary
pub const FINISH_DELAY_MS: f64 = 250.0;

/// Where the engine is in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// No run in progress
    Idle,

    /// Calibration sequence running; claps feed the baseline estimate
    Calibrating,

    /// Calibrated and waiting for a play run to start
    Ready,

    /// Play run in progress; claps are judged
    Playing,

    /// Play run complete; summary emitted
    Finished,
}

impl GamePhase {
    /// Whether claps are judged and the schedule is live
    pub fn is_active(&self) -> bool {
        matches!(self, GamePhase::Calibrating | GamePhase::Playing)
    }
}

/// Errors surfaced when starting a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid level settings: {0}")]
    InvalidLevel(String),

    #[error("No calibration baseline; run a calibration or set one explicitly")]
    NotCalibrated,
}

/// The rhythm-judging engine
///
/// Owns all mutable state: motion signal, detector state, beat timeline,
/// and the latency offset. The host feeds landmark frames as they
/// arrive and calls [`tick`](ClapEngine::tick) often enough to honor
/// [`next_deadline`](ClapEngine::next_deadline); the cooperative driver
/// in [`crate::engine::driver`] does both on a tokio runtime.
pub struct ClapEngine {
    filter: MotionFilter,
    detector: OnsetDetector,
    judge: Judge,
    sweeper: TimeoutSweeper,
    timeline: BeatTimeline,

    phase: GamePhase,
    bpm: f64,

    /// Next beat index whose pulse has not fired yet
    next_pulse: usize,

    /// Pending tempo change for the current run, consumed when it fires
    tempo_shift: Option<TempoShift>,
    distraction: bool,

    clap_count: u32,
    calibrated: bool,

    /// When set, transition to Finished once now passes it
    finish_at: Option<f64>,

    /// When set, compute the calibration baseline once now passes it
    settle_at: Option<f64>,

    run_id: Option<Uuid>,
    sink: Option<EventSink>,
}

impl ClapEngine {
    pub fn new() -> Self {
        ClapEngine {
            filter: MotionFilter::new(),
            detector: OnsetDetector::default(),
            judge: Judge::default(),
            sweeper: TimeoutSweeper::new(),
            timeline: BeatTimeline::default(),
            phase: GamePhase::Idle,
            bpm: 0.0,
            next_pulse: 0,
            tempo_shift: None,
            distraction: false,
            clap_count: 0,
            calibrated: false,
            finish_at: None,
            settle_at: None,
            run_id: None,
            sink: None,
        }
    }

    /// Register the observer callback receiving engine events
    pub fn set_event_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn timeline(&self) -> &BeatTimeline {
        &self.timeline
    }

    pub fn progress_percent(&self) -> f32 {
        self.timeline.progress_percent()
    }

    pub fn clap_count(&self) -> u32 {
        self.clap_count
    }

    pub fn current_bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Effective latency offset currently applied when judging
    pub fn offset_ms(&self) -> f64 {
        self.judge.offset_ms()
    }

    pub fn baseline_ms(&self) -> f64 {
        self.judge.baseline_ms()
    }

    /// Install a stored calibration baseline instead of running a
    /// calibration sequence
    pub fn set_baseline_ms(&mut self, baseline_ms: f64) {
        self.judge.set_baseline_ms(baseline_ms);
        self.calibrated = true;
        if self.phase == GamePhase::Idle {
            self.set_phase(GamePhase::Ready);
        }
    }

    pub fn sensitivity(&self) -> f64 {
        self.detector.sensitivity()
    }

    /// Adjust detection sensitivity live
    ///
    /// The detection pipeline restarts: signal history and detector
    /// state are released so the next frame starts from Separate.
    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.detector.set_sensitivity(sensitivity);
        self.detector.rearm();
        self.filter.reset();
    }

    /// Start the fixed calibration sequence
    pub fn start_calibration(&mut self, now_ms: f64) {
        self.begin_sequence(
            schedule(CALIBRATION_BEATS, CALIBRATION_BPM, now_ms),
            CALIBRATION_BPM,
            None,
            false,
        );
        self.run_id = None;
        self.set_phase(GamePhase::Calibrating);
        log::info!(
            "calibration started: {} beats at {} bpm",
            CALIBRATION_BEATS,
            CALIBRATION_BPM
        );
    }

    /// Start a play run with the given level settings
    pub fn start_run(&mut self, settings: &LevelSettings, now_ms: f64) -> Result<(), EngineError> {
        if let Some(problem) = settings.problem() {
            return Err(EngineError::InvalidLevel(problem));
        }
        if !self.calibrated {
            return Err(EngineError::NotCalibrated);
        }

        self.begin_sequence(
            schedule(settings.beat_count, settings.bpm, now_ms + settings.intro_ms),
            settings.bpm,
            settings.tempo_shift,
            settings.distraction,
        );
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.set_phase(GamePhase::Playing);
        log::info!(
            "run {} started: {} beats at {} bpm",
            run_id,
            settings.beat_count,
            settings.bpm
        );
        Ok(())
    }

    /// Stop the engine and release all per-run and pipeline state
    pub fn stop(&mut self) {
        self.timeline = BeatTimeline::default();
        self.filter.reset();
        self.detector.rearm();
        self.judge.reset_adjustment();
        self.sweeper.reset();
        self.next_pulse = 0;
        self.tempo_shift = None;
        self.distraction = false;
        self.finish_at = None;
        self.settle_at = None;
        self.run_id = None;
        self.set_phase(GamePhase::Idle);
    }

    fn begin_sequence(
        &mut self,
        timeline: BeatTimeline,
        bpm: f64,
        tempo_shift: Option<TempoShift>,
        distraction: bool,
    ) {
        self.timeline = timeline;
        self.bpm = bpm;
        self.next_pulse = 0;
        self.tempo_shift = tempo_shift;
        self.distraction = distraction;
        self.clap_count = 0;
        self.finish_at = None;
        self.settle_at = None;
        self.judge.reset_adjustment();
        self.sweeper.reset();
    }

    /// Process one landmark frame through the detection pipeline
    ///
    /// Signal loss resets the detector to Separate; a detected clap is
    /// judged immediately if a run is active, otherwise ignored.
    pub fn feed_frame(&mut self, frame: &LandmarkFrame) {
        match self.filter.update(frame) {
            Some(motion) => {
                if let Some(clap) = self.detector.update(&motion, frame.timestamp_ms) {
                    self.on_clap(clap);
                }
            }
            None => self.detector.reset(),
        }
    }

    fn on_clap(&mut self, clap: ClapEvent) {
        if !self.phase.is_active() {
            return;
        }

        // A clap with no remaining unjudged beat is silently ignored
        let Some(judged) = self.judge.on_clap(&mut self.timeline, clap.timestamp_ms) else {
            return;
        };

        self.clap_count += 1;
        let percent = self.timeline.progress_percent();
        self.emit(EngineEvent::Clap {
            timestamp_ms: clap.timestamp_ms,
        });
        self.emit(EngineEvent::Verdict {
            beat_index: judged.beat_index,
            verdict: judged.verdict,
            delta_ms: judged.delta_ms,
        });
        self.emit(EngineEvent::Progress { percent });

        if self.phase == GamePhase::Playing && self.timeline.all_judged() {
            self.finish_at = Some(clap.timestamp_ms + FINISH_DELAY_MS);
        }
    }

    /// Drive everything scheduled up to `now_ms`: beat pulses, tempo
    /// shifts, timeout sweeps, calibration settlement, and the delayed
    /// finish transition
    pub fn tick(&mut self, now_ms: f64) {
        if !self.phase.is_active() {
            return;
        }

        self.pump_pulses(now_ms);

        if self.sweeper.due(now_ms) {
            self.run_sweep(now_ms);
        }

        if let Some(at) = self.settle_at {
            if now_ms >= at && self.phase == GamePhase::Calibrating {
                self.finish_calibration(now_ms);
            }
        }

        if let Some(at) = self.finish_at {
            if now_ms >= at && self.phase == GamePhase::Playing {
                self.finish_run();
            }
        }
    }

    /// Earliest time the engine needs its next tick, if any work is
    /// scheduled
    pub fn next_deadline(&self, now_ms: f64) -> Option<f64> {
        if !self.phase.is_active() {
            return None;
        }

        let mut deadline = self.sweeper.next_due(now_ms);
        if let Some(beat) = self.timeline.get(self.next_pulse) {
            deadline = deadline.min(beat.expected_at);
        }
        if let Some(at) = self.settle_at {
            deadline = deadline.min(at);
        }
        if let Some(at) = self.finish_at {
            deadline = deadline.min(at);
        }
        Some(deadline)
    }

    fn pump_pulses(&mut self, now_ms: f64) {
        while let Some(expected_at) = self
            .timeline
            .get(self.next_pulse)
            .map(|beat| beat.expected_at)
        {
            if expected_at > now_ms {
                break;
            }

            let index = self.next_pulse;
            self.next_pulse += 1;

            self.emit(EngineEvent::Pulse { beat_index: index });
            if self.distraction && index % 2 == 1 {
                self.emit(EngineEvent::Distraction { beat_index: index });
            }

            // Tempo shift fires once the configured beat has pulsed;
            // only beats strictly after it are retimed, forward from now
            if let Some(shift) = self.tempo_shift {
                if index + 1 == shift.after_beat {
                    retime(&mut self.timeline, index + 1, shift.bpm, now_ms);
                    self.bpm = shift.bpm;
                    self.tempo_shift = None;
                    self.emit(EngineEvent::TempoChanged { bpm: shift.bpm });
                    log::info!("tempo shift after beat {}: now {} bpm", shift.after_beat, shift.bpm);
                }
            }

            // Once the last calibration beat fires, wait for it to age
            // past the Good window before computing the baseline
            if self.phase == GamePhase::Calibrating && self.next_pulse == self.timeline.len() {
                self.settle_at =
                    Some(now_ms + self.judge.config().good_ms + SETTLE_EXTRA_MS);
            }
        }
    }

    fn run_sweep(&mut self, now_ms: f64) {
        let report = self.sweep_now(now_ms);

        if report.changed() {
            let percent = self.timeline.progress_percent();
            self.emit(EngineEvent::Progress { percent });
        }

        if report.all_judged
            && !self.timeline.is_empty()
            && self.phase == GamePhase::Playing
            && self.finish_at.is_none()
        {
            self.finish_at = Some(now_ms + FINISH_DELAY_MS);
        }
    }

    fn sweep_now(&mut self, now_ms: f64) -> SweepReport {
        let offset = self.judge.offset_ms();
        let good_ms = self.judge.config().good_ms;
        self.sweeper
            .sweep(&mut self.timeline, now_ms, offset, good_ms)
    }

    fn finish_calibration(&mut self, now_ms: f64) {
        self.settle_at = None;

        // One forced sweep so every unresolved beat is accounted for
        let _ = self.sweep_now(now_ms);

        let result = baseline_offset(&self.timeline);
        self.judge.set_baseline_ms(result.offset_ms);
        self.judge.reset_adjustment();
        self.calibrated = true;

        log::info!(
            "calibration complete: baseline {:.0} ms over {} claps",
            result.offset_ms,
            result.sampled_beats
        );
        self.emit(EngineEvent::CalibrationDone { result });
        self.set_phase(GamePhase::Ready);
    }

    fn finish_run(&mut self) {
        self.finish_at = None;

        let run_id = self.run_id.take().unwrap_or_else(Uuid::new_v4);
        let summary = RunSummary::from_timeline(run_id, &self.timeline);
        log::info!(
            "run {} finished: {} perfect / {} good / {} miss, accuracy {}%",
            run_id,
            summary.perfect,
            summary.good,
            summary.miss,
            summary.accuracy
        );
        self.emit(EngineEvent::RunFinished { summary });
        self.set_phase(GamePhase::Finished);
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(EngineEvent::PhaseChanged { phase });
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink(event);
        }
    }
}

impl Default for ClapEngine {
    fn default() -> Self {
        Self::new()
    }
}
