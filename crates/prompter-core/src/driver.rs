//! Frame scheduling for a session.
//!
//! The loop is cooperative: one frame at a time, and the session's liveness
//! flag is checked at the top of every iteration so an ended session never
//! gets another frame.

use crate::controller::ScrollState;
use crate::error::PrompterError;
use crate::session::PrompterSession;
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

pub trait FrameClock {
    /// Block until the next frame is due and return its timestamp relative
    /// to the clock's origin.
    fn next_frame(&mut self) -> Duration;
}

/// Wall-clock pacing at a fixed cadence.
#[derive(Debug)]
pub struct IntervalClock {
    origin: Instant,
    interval: Duration,
    next: Instant,
}

impl IntervalClock {
    pub fn new(frames_per_second: u32) -> Self {
        let interval = Duration::from_secs(1) / frames_per_second.max(1);
        let origin = Instant::now();
        Self {
            origin,
            interval,
            next: origin,
        }
    }

    pub fn sixty_hz() -> Self {
        Self::new(60)
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl FrameClock for IntervalClock {
    fn next_frame(&mut self) -> Duration {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        self.next += self.interval;
        let now = Instant::now();
        if self.next < now {
            // fell behind; do not try to catch up with a burst of frames
            self.next = now + self.interval;
        }
        now - self.origin
    }
}

/// Deterministic clock that advances by a fixed step without sleeping.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    now: Duration,
    step: Duration,
}

impl SimulatedClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            step,
        }
    }

    pub fn sixty_hz() -> Self {
        Self::new(Duration::from_secs(1) / 60)
    }

    pub fn now(&self) -> Duration {
        self.now
    }
}

impl FrameClock for SimulatedClock {
    fn next_frame(&mut self) -> Duration {
        self.now += self.step;
        self.now
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub elapsed: Duration,
    pub last_state: ScrollState,
    /// Fatal recognition errors raised during frames. The session has
    /// already stopped the microphone for each of them.
    pub fatal_errors: Vec<PrompterError>,
}

/// Drive `session` until it ends or `before_frame` breaks.
///
/// `before_frame` runs once per frame with the frame timestamp, ahead of
/// the session's own update. Hosts use it to deliver input that became due.
pub fn run_frame_loop<C, F>(
    session: &mut PrompterSession,
    clock: &mut C,
    mut before_frame: F,
) -> FrameStats
where
    C: FrameClock + ?Sized,
    F: FnMut(&mut PrompterSession, Duration) -> ControlFlow<()>,
{
    let mut stats = FrameStats {
        last_state: session.scroll(),
        ..FrameStats::default()
    };
    let mut previous: Option<Duration> = None;

    loop {
        if !session.is_active() {
            debug!(frames = stats.frames, "Session no longer active; leaving frame loop");
            break;
        }
        let now = clock.next_frame();
        if before_frame(session, now).is_break() {
            debug!(frames = stats.frames, "Frame loop stopped by host");
            break;
        }

        let dt_secs = previous.map_or(0.0, |prev| now.saturating_sub(prev).as_secs_f32());
        previous = Some(now);

        match session.frame(now, dt_secs) {
            Ok(state) => {
                trace!(current = state.current, target_px = state.target, "Frame");
                stats.last_state = state;
            }
            Err(err) => {
                warn!("Frame raised a fatal recognition error: {err}");
                stats.last_state = session.scroll();
                stats.fatal_errors.push(err);
            }
        }
        stats.frames += 1;
        stats.elapsed = now;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrompterConfig;
    use crate::error::Result;
    use crate::recognition::RecognitionEngine;

    struct Quiet;

    impl RecognitionEngine for Quiet {
        fn start(&mut self, _language: &str) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn simulated_clock_steps_evenly() {
        let mut clock = SimulatedClock::new(Duration::from_millis(10));
        assert_eq!(clock.next_frame(), Duration::from_millis(10));
        assert_eq!(clock.next_frame(), Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn loop_exits_once_liveness_is_cleared() {
        let mut session =
            PrompterSession::start("a b c", PrompterConfig::default(), Box::new(Quiet))
                .expect("session");
        session.toggle_play();
        let liveness = session.liveness();
        let mut clock = SimulatedClock::new(Duration::from_millis(10));
        let stats = run_frame_loop(&mut session, &mut clock, |_, now| {
            if now >= Duration::from_secs(2) {
                liveness.end();
            }
            ControlFlow::Continue(())
        });
        // the 2s frame is counted but no longer ticks; the next iteration exits
        assert_eq!(stats.frames, 200);
        assert!(stats.last_state.target > 70.0);
        assert!(stats.fatal_errors.is_empty());
    }

    #[test]
    fn host_can_break_before_a_frame() {
        let mut session =
            PrompterSession::start("a b c", PrompterConfig::default(), Box::new(Quiet))
                .expect("session");
        let mut clock = SimulatedClock::sixty_hz();
        let mut seen = 0;
        let stats = run_frame_loop(&mut session, &mut clock, |_, _| {
            seen += 1;
            if seen > 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(stats.frames, 5);
        assert!(session.is_active());
    }
}
