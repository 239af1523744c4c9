// Beat scheduling - builds and retimes beat timelines
// Fixed lead-in before the first beat, even spacing at 60000/bpm

use crate::timeline::beat::{Beat, BeatTimeline};

/// Delay between a run's start instant and its first beat, giving the
/// player and any countdown time to prepare before judging begins
pub const LEAD_IN_MS: f64 = 650.0;

/// Interval between beats at the given tempo, in milliseconds
pub fn beat_interval_ms(bpm: f64) -> f64 {
    60_000.0 / bpm
}

/// Build a timeline of `beat_count` beats at fixed tempo
///
/// The first beat lands at `start_at_ms + LEAD_IN_MS`. A non-positive
/// tempo yields an empty timeline.
pub fn schedule(beat_count: usize, bpm: f64, start_at_ms: f64) -> BeatTimeline {
    if bpm <= 0.0 {
        return BeatTimeline::default();
    }

    let interval = beat_interval_ms(bpm);
    let first = start_at_ms + LEAD_IN_MS;
    BeatTimeline::new(
        (0..beat_count)
            .map(|i| Beat::at(first + i as f64 * interval))
            .collect(),
    )
}

/// Replace the schedule of all beats from `from_index` onward with a
/// fresh one stepping by the new tempo, starting from `now_ms`
///
/// Beat `from_index` lands at `now_ms + 60000/new_bpm`. Beats before
/// `from_index` are untouched. The new schedule restarts relative to
/// the moment of the change, never relative to the old schedule's
/// drift; callers retime only once the preceding beat has fired, which
/// keeps the timeline ordered.
pub fn retime(timeline: &mut BeatTimeline, from_index: usize, new_bpm: f64, now_ms: f64) {
    if new_bpm <= 0.0 {
        return;
    }

    let interval = beat_interval_ms(new_bpm);
    let mut at = now_ms;
    for beat in timeline.beats_mut().iter_mut().skip(from_index) {
        at += interval;
        beat.expected_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(timeline: &BeatTimeline) {
        assert!(timeline
            .beats()
            .windows(2)
            .all(|w| w[0].expected_at <= w[1].expected_at));
    }

    #[test]
    fn test_schedule_spacing_at_sixty_bpm() {
        let timeline = schedule(5, 60.0, 1000.0);

        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.get(0).unwrap().expected_at, 1000.0 + LEAD_IN_MS);
        for pair in timeline.beats().windows(2) {
            assert!((pair[1].expected_at - pair[0].expected_at - 1000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_schedule_zero_beats() {
        assert!(schedule(0, 120.0, 0.0).is_empty());
    }

    #[test]
    fn test_schedule_rejects_bad_tempo() {
        assert!(schedule(8, 0.0, 0.0).is_empty());
        assert!(schedule(8, -10.0, 0.0).is_empty());
    }

    #[test]
    fn test_retime_restarts_from_now() {
        let mut timeline = schedule(20, 115.0, 0.0);
        let before: Vec<f64> = timeline.beats().iter().map(|b| b.expected_at).collect();

        // Tempo change right after beat 13 fired
        let now = before[13] + 5.0;
        retime(&mut timeline, 14, 116.0, now);

        let interval = beat_interval_ms(116.0);
        assert!((timeline.get(14).unwrap().expected_at - (now + interval)).abs() < 1e-9);
        assert!((timeline.get(15).unwrap().expected_at - (now + 2.0 * interval)).abs() < 1e-9);

        // Earlier beats unchanged
        for i in 0..14 {
            assert_eq!(timeline.get(i).unwrap().expected_at, before[i]);
        }
        assert_ordered(&timeline);
    }

    #[test]
    fn test_retime_to_faster_tempo_compresses_spacing() {
        let mut timeline = schedule(10, 60.0, 0.0);
        let now = timeline.get(4).unwrap().expected_at + 1.0;
        retime(&mut timeline, 5, 120.0, now);

        for pair in timeline.beats()[5..].windows(2) {
            assert!((pair[1].expected_at - pair[0].expected_at - 500.0).abs() < 1e-9);
        }
        assert_ordered(&timeline);
    }

    #[test]
    fn test_retime_past_end_is_noop() {
        let mut timeline = schedule(3, 60.0, 0.0);
        let before: Vec<f64> = timeline.beats().iter().map(|b| b.expected_at).collect();

        retime(&mut timeline, 3, 120.0, 5000.0);
        let after: Vec<f64> = timeline.beats().iter().map(|b| b.expected_at).collect();
        assert_eq!(before, after);
    }
}
