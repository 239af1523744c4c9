// Run configuration - level presets and tempo-shift settings

use serde::{Deserialize, Serialize};

/// A mid-run tempo change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoShift {
    /// 1-based beat number after which the remaining beats are retimed
    pub after_beat: usize,

    /// Tempo from that point on
    pub bpm: f64,
}

/// Schedule for one play run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSettings {
    pub bpm: f64,

    pub beat_count: usize,

    /// Musical intro before the schedule's lead-in starts, in
    /// milliseconds; judging begins after intro plus lead-in
    pub intro_ms: f64,

    /// Optional tempo change partway through the run
    pub tempo_shift: Option<TempoShift>,

    /// Emit distraction cues on off-beats (hardest level only)
    pub distraction: bool,
}

impl LevelSettings {
    pub fn new(bpm: f64, beat_count: usize, intro_ms: f64) -> Self {
        LevelSettings {
            bpm,
            beat_count,
            intro_ms,
            tempo_shift: None,
            distraction: false,
        }
    }

    /// Slow warm-up level
    pub fn level_one() -> Self {
        LevelSettings::new(58.0, 16, 2240.0)
    }

    /// Mid-tempo level
    pub fn level_two() -> Self {
        LevelSettings::new(99.0, 31, 4200.0)
    }

    /// Fast level with a tempo change after beat 14 and distraction cues
    pub fn level_three() -> Self {
        LevelSettings {
            bpm: 115.0,
            beat_count: 29,
            intro_ms: 4000.0,
            tempo_shift: Some(TempoShift {
                after_beat: 14,
                bpm: 116.0,
            }),
            distraction: true,
        }
    }

    /// Reason this configuration cannot start a run, if any
    pub(crate) fn problem(&self) -> Option<String> {
        if self.beat_count == 0 {
            return Some("beat count must be at least 1".to_string());
        }
        if !(self.bpm > 0.0) {
            return Some(format!("bpm must be positive, got {}", self.bpm));
        }
        if self.intro_ms < 0.0 {
            return Some(format!("intro must be non-negative, got {}", self.intro_ms));
        }
        if let Some(shift) = &self.tempo_shift {
            if !(shift.bpm > 0.0) {
                return Some(format!("shift bpm must be positive, got {}", shift.bpm));
            }
            if shift.after_beat == 0 || shift.after_beat >= self.beat_count {
                return Some(format!(
                    "tempo shift after beat {} does not fall inside a {}-beat run",
                    shift.after_beat, self.beat_count
                ));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(LevelSettings::level_one().problem().is_none());
        assert!(LevelSettings::level_two().problem().is_none());
        assert!(LevelSettings::level_three().problem().is_none());
    }

    #[test]
    fn test_level_three_shifts_tempo() {
        let level = LevelSettings::level_three();
        let shift = level.tempo_shift.unwrap();

        assert_eq!(shift.after_beat, 14);
        assert_eq!(shift.bpm, 116.0);
        assert!(level.distraction);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(LevelSettings::new(120.0, 0, 0.0).problem().is_some());
        assert!(LevelSettings::new(0.0, 8, 0.0).problem().is_some());
        assert!(LevelSettings::new(120.0, 8, -1.0).problem().is_some());

        let mut level = LevelSettings::new(120.0, 8, 0.0);
        level.tempo_shift = Some(TempoShift {
            after_beat: 8,
            bpm: 130.0,
        });
        assert!(level.problem().is_some());
    }
}
