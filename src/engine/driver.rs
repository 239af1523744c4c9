// Cooperative engine driver
// Single-task loop interleaving landmark frames with scheduled ticks on
// a tokio runtime; no parallel execution anywhere

use tokio::sync::mpsc;

use crate::engine::clock::EngineClock;
use crate::engine::core::ClapEngine;
use crate::tracker::{HandTracker, LandmarkFrame, TrackerError};

/// Channel carrying landmark frames from the capture loop to the driver
pub fn frame_channel() -> (
    mpsc::UnboundedSender<LandmarkFrame>,
    mpsc::UnboundedReceiver<LandmarkFrame>,
) {
    mpsc::unbounded_channel()
}

/// Run one camera frame through a tracking backend and into the engine
///
/// Tracker failures propagate to the caller; the engine is only fed on
/// success, so a dropped frame simply produces no detection update.
pub fn process_camera_frame<T: HandTracker>(
    tracker: &mut T,
    raw: &T::Frame,
    timestamp_ms: f64,
    engine: &mut ClapEngine,
) -> Result<(), TrackerError> {
    let frame = tracker.detect(raw, timestamp_ms)?;
    engine.feed_frame(&frame);
    Ok(())
}

/// Drive the engine until the current sequence settles
///
/// Call after `start_calibration` or `start_run`; returns once the
/// engine leaves its active phase (Ready after calibration, Finished
/// after play) or the frame channel closes. Between frames the task
/// suspends exactly until the engine's next deadline, so beats fire on
/// schedule and the timeout sweeper keeps its cadence without busy
/// polling.
pub async fn drive(
    engine: &mut ClapEngine,
    clock: &EngineClock,
    frames: &mut mpsc::UnboundedReceiver<LandmarkFrame>,
) {
    loop {
        let now = clock.now_ms();
        engine.tick(now);

        let Some(deadline) = engine.next_deadline(now) else {
            // Engine settled; nothing scheduled remains
            return;
        };

        tokio::select! {
            maybe = frames.recv() => match maybe {
                Some(frame) => engine.feed_frame(&frame),
                None => return,
            },
            _ = tokio::time::sleep_until(clock.instant_at(deadline)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::core::GamePhase;
    use crate::engine::events::EngineEvent;
    use crate::engine::config::LevelSettings;
    use crate::timeline::Verdict;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_sink(events: &Rc<RefCell<Vec<EngineEvent>>>) -> Box<dyn FnMut(EngineEvent)> {
        let events = Rc::clone(events);
        Box::new(move |event| events.borrow_mut().push(event))
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattended_run_times_out_every_beat() {
        let clock = EngineClock::new();
        let mut engine = ClapEngine::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        engine.set_event_sink(recording_sink(&events));
        engine.set_baseline_ms(0.0);

        let level = LevelSettings::new(120.0, 3, 0.0);
        engine.start_run(&level, clock.now_ms()).unwrap();

        // Keep the sender alive but never send a frame: the driver runs
        // on deadlines alone and every beat ages into a Miss
        let (_tx, mut rx) = frame_channel();
        drive(&mut engine, &clock, &mut rx).await;

        assert_eq!(engine.phase(), GamePhase::Finished);
        let tally = engine.timeline().tally();
        assert_eq!(tally.miss, 3);
        assert!(engine.timeline().beats().iter().all(|b| b.timed_out));

        let events = events.borrow();
        let pulses = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Pulse { .. }))
            .count();
        assert_eq!(pulses, 3);
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::RunFinished { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattended_calibration_settles_to_default_baseline() {
        let clock = EngineClock::new();
        let mut engine = ClapEngine::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        engine.set_event_sink(recording_sink(&events));

        engine.start_calibration(clock.now_ms());
        let (_tx, mut rx) = frame_channel();
        drive(&mut engine, &clock, &mut rx).await;

        assert_eq!(engine.phase(), GamePhase::Ready);
        assert!(engine.is_calibrated());
        // No claps arrived, so the baseline fell back to the default
        assert_eq!(engine.baseline_ms(), 300.0);

        let events = events.borrow();
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::CalibrationDone { result } if result.sampled_beats == 0
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_the_frame_channel_stops_the_driver() {
        let clock = EngineClock::new();
        let mut engine = ClapEngine::new();
        engine.set_baseline_ms(0.0);
        engine
            .start_run(&LevelSettings::new(60.0, 100, 0.0), clock.now_ms())
            .unwrap();

        let (tx, mut rx) = frame_channel();
        drop(tx);
        drive(&mut engine, &clock, &mut rx).await;

        // The run is far from judged; the driver stopped on channel close
        assert_eq!(engine.phase(), GamePhase::Playing);
        assert!(!engine.timeline().all_judged());
        engine.stop();
        assert_eq!(engine.phase(), GamePhase::Idle);
        assert!(engine.timeline().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_interleave_with_the_schedule() {
        let clock = EngineClock::new();
        let mut engine = ClapEngine::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        engine.set_event_sink(recording_sink(&events));
        engine.set_baseline_ms(0.0);

        let level = LevelSettings::new(60.0, 2, 0.0);
        engine.start_run(&level, clock.now_ms()).unwrap();
        let first_beat = engine.timeline().get(0).unwrap().expected_at;

        let (tx, mut rx) = frame_channel();
        let clap_clock = clock;
        let local = tokio::task::LocalSet::new();
        local.spawn_local(async move {
            // Synthesize an approach-then-contact gesture around the
            // first beat; the second beat is left to time out
            for (dt, gap) in [(-120.0, 500.0), (-60.0, 420.0), (0.0, 60.0)] {
                tokio::time::sleep_until(clap_clock.instant_at(first_beat + dt)).await;
                let ts = clap_clock.now_ms();
                let _ = tx.send(crate::motion::test_support::two_palm_frame(ts, gap));
            }
            // Keep the channel open until well past the run's end
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
        });
        local
            .run_until(drive(&mut engine, &clock, &mut rx))
            .await;

        assert_eq!(engine.phase(), GamePhase::Finished);
        let beats = engine.timeline().beats();
        assert_eq!(beats[0].verdict, Some(Verdict::Perfect));
        assert!(!beats[0].timed_out);
        assert_eq!(beats[1].verdict, Some(Verdict::Miss));
        assert!(beats[1].timed_out);
        assert_eq!(engine.clap_count(), 1);
    }
}
