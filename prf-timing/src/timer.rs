use std::time::{Duration, Instant};

/// Monotonic run clock.
///
/// Readings are seconds since the last `reset`; calendar time never enters here.
pub trait Clock {
    /// Establish a new epoch.
    fn reset(&mut self);
    fn now(&self) -> f64;
    fn sleep(&self, d: Duration);
}

/// Platform-specific high-precision timer implementation
/// Provides sub-millisecond sleeps for the presentation loop
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
}

impl Clock for HighPrecisionTimer {
    fn reset(&mut self) {
        self.start = Instant::now();
    }
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // Relative sleep; an early EINTR wake only shortens one loop tick.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_are_monotonic() {
        let timer = HighPrecisionTimer::new();
        let a = timer.now();
        let b = timer.now();
        assert!(b >= a);
    }

    #[test]
    fn sleep_waits_at_least_requested() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.now() - before >= 0.002);
    }

    #[test]
    fn reset_moves_epoch() {
        let mut timer = HighPrecisionTimer::new();
        timer.sleep(Duration::from_millis(5));
        timer.reset();
        assert!(timer.now() < 0.005);
    }
}
