// Claptrack - Camera-clap rhythm judging engine
// Module declarations

pub mod engine;
pub mod judge;
pub mod motion;
pub mod timeline;
pub mod tracker;

pub use engine::{
    CalibrationResult, ClapEngine, EngineClock, EngineError, EngineEvent, GamePhase,
    LevelSettings, RunSummary, TempoShift,
};
pub use judge::{Judge, JudgeConfig, TimeoutSweeper, GOOD_MS, PERFECT_MS};
pub use motion::{
    ClapEvent, DetectorConfig, DetectorState, MotionFilter, MotionSignal, OnsetDetector,
};
pub use timeline::{Beat, BeatTimeline, Verdict};
pub use tracker::{Hand, HandTracker, LandmarkFrame, LandmarkPoint, TrackerError};
