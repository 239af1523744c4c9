// Engine module
// Owned game state machine, calibration policy, run configuration,
// event emission, and the cooperative tokio driver

pub mod calibration;
pub mod clock;
pub mod config;
pub mod core;
pub mod driver;
pub mod events;

pub use calibration::{
    baseline_offset, CalibrationResult, CALIBRATION_BEATS, CALIBRATION_BPM, DEFAULT_BASELINE_MS,
};
pub use clock::EngineClock;
pub use config::{LevelSettings, TempoShift};
pub use core::{ClapEngine, EngineError, GamePhase, FINISH_DELAY_MS};
pub use driver::{drive, frame_channel, process_camera_frame};
pub use events::{reward_tier, EngineEvent, EventSink, RunSummary};
