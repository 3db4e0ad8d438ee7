use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::session::configuration::TimeMode;

/// A monotonic time source. Readings are offsets from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Clone, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// CPU time consumed by the calling thread.
///
/// Readings only make sense on the thread that drives the session.
#[cfg(unix)]
#[derive(Clone, Debug, Default)]
pub struct CpuClock;

#[cfg(unix)]
impl Clock for CpuClock {
    fn now(&self) -> Duration {
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        let err = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
        if err != 0 {
            return Duration::ZERO;
        }
        Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
    }
}

/// A clock that only moves when told to. Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

pub fn clock_for(time_mode: &TimeMode) -> Box<dyn Clock + Send> {
    match time_mode {
        TimeMode::WallTime => Box::new(WallClock::new()),
        #[cfg(unix)]
        TimeMode::CpuTime => Box::new(CpuClock),
        #[cfg(not(unix))]
        TimeMode::CpuTime => {
            log::warn!("CPU time is not supported on this platform, falling back to wall time");
            Box::new(WallClock::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        let shared = clock.clone();
        assert_eq!(clock.now(), Duration::ZERO);

        shared.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(5));

        clock.set(Duration::from_secs(1));
        assert_eq!(shared.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_wall_clock_is_monotonic() {
        let clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[cfg(unix)]
    #[test]
    fn test_cpu_clock_advances_with_work() {
        let clock = CpuClock;
        let before = clock.now();
        let mut acc = 0u64;
        for i in 0..2_000_000u64 {
            acc = acc.wrapping_mul(31).wrapping_add(i);
        }
        std::hint::black_box(acc);
        assert!(clock.now() >= before);
    }
}
