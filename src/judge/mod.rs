// Judging module
// Clap-to-beat matching, verdict classification, adaptive latency offset,
// and timeout miss sweeping

pub mod scoring;
pub mod sweeper;

pub use scoring::{classify, Judge, JudgeConfig, JudgedClap, GOOD_MS, PERFECT_MS};
pub use sweeper::{SweepReport, TimeoutSweeper, SWEEP_INTERVAL_MS};
