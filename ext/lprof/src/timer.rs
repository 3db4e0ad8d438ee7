use std::hint::black_box;
use std::time::Duration;

use crate::clock::Clock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
}

/// Exclusive-time stopwatch for one frame.
///
/// Every operation takes the current clock reading, so the timer itself never
/// touches a clock and `elapsed` is free of side effects.
#[derive(Clone, Copy, Debug)]
pub struct FrameTimer {
    accumulated: Duration,
    since: Duration,
    state: TimerState,
}

impl FrameTimer {
    pub fn start(now: Duration) -> Self {
        Self {
            accumulated: Duration::ZERO,
            since: now,
            state: TimerState::Running,
        }
    }

    /// No-op when already paused.
    pub fn pause(&mut self, now: Duration) {
        if self.state == TimerState::Paused {
            return;
        }
        self.accumulated += now.saturating_sub(self.since);
        self.state = TimerState::Paused;
    }

    /// No-op when already running.
    pub fn resume(&mut self, now: Duration) {
        if self.state == TimerState::Running {
            return;
        }
        self.since = now;
        self.state = TimerState::Running;
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.state {
            TimerState::Running => self.accumulated + now.saturating_sub(self.since),
            TimerState::Paused => self.accumulated,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }
}

/// Estimates the bookkeeping cost of one profiled call by running the timer
/// through the same start/pause/resume/read cycle the engine performs.
pub fn calibrate(clock: &dyn Clock, iterations: u32) -> Duration {
    if iterations == 0 {
        return Duration::ZERO;
    }

    let begin = clock.now();
    for _ in 0..iterations {
        let mut timer = FrameTimer::start(clock.now());
        timer.pause(clock.now());
        timer.resume(clock.now());
        black_box(timer.elapsed(clock.now()));
    }
    clock.now().saturating_sub(begin) / iterations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, WallClock};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_running_timer() {
        let timer = FrameTimer::start(ms(10));
        assert!(timer.is_running());
        assert_eq!(timer.elapsed(ms(10)), Duration::ZERO);
        assert_eq!(timer.elapsed(ms(25)), ms(15));
    }

    #[test]
    fn test_paused_timer_does_not_grow() {
        let mut timer = FrameTimer::start(ms(0));
        timer.pause(ms(7));
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.elapsed(ms(7)), ms(7));
        assert_eq!(timer.elapsed(ms(1000)), ms(7));
    }

    #[test]
    fn test_resume_accumulates() {
        let mut timer = FrameTimer::start(ms(0));
        timer.pause(ms(5));
        timer.resume(ms(20));
        assert_eq!(timer.elapsed(ms(23)), ms(8));
        timer.pause(ms(30));
        assert_eq!(timer.elapsed(ms(99)), ms(15));
    }

    #[test]
    fn test_double_pause_and_resume_are_noops() {
        let mut timer = FrameTimer::start(ms(0));
        timer.pause(ms(4));
        timer.pause(ms(9));
        assert_eq!(timer.elapsed(ms(50)), ms(4));

        timer.resume(ms(10));
        timer.resume(ms(40));
        assert_eq!(timer.elapsed(ms(50)), ms(44));
    }

    #[test]
    fn test_clock_going_backwards_saturates() {
        let mut timer = FrameTimer::start(ms(10));
        assert_eq!(timer.elapsed(ms(3)), Duration::ZERO);
        timer.pause(ms(3));
        assert_eq!(timer.elapsed(ms(3)), Duration::ZERO);
    }

    #[test]
    fn test_calibrate() {
        let clock = ManualClock::new();
        assert_eq!(calibrate(&clock, 100), Duration::ZERO);
        assert_eq!(calibrate(&clock, 0), Duration::ZERO);

        let overhead = calibrate(&WallClock::new(), 1000);
        assert!(overhead < Duration::from_millis(10));
    }
}
