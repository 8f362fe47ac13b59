use crate::timer::Clock;
use std::cell::Cell;
use std::time::Duration;

/// Deterministic clock whose k-th reading after a reset is `k * step`.
///
/// Sleeps do not move time; only reads do.
#[derive(Debug, Clone)]
pub struct SteppedClock {
    step: f64,
    reads: Cell<u64>,
}

impl SteppedClock {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads.get()
    }
}

impl Clock for SteppedClock {
    fn reset(&mut self) {
        self.reads.set(0);
    }
    fn now(&self) -> f64 {
        let k = self.reads.get();
        self.reads.set(k + 1);
        k as f64 * self.step
    }
    fn sleep(&self, _d: Duration) {}
}

/// Clock that only advances when slept on or advanced by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.elapsed.set(self.elapsed.get() + d);
    }
}

impl Clock for ManualClock {
    fn reset(&mut self) {
        self.elapsed.set(Duration::ZERO);
    }
    fn now(&self) -> f64 {
        self.elapsed.get().as_secs_f64()
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_clock_advances_per_read() {
        let mut clock = SteppedClock::new(0.1);
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.now(), 0.1);
        clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.now(), 0.2);
        clock.reset();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn manual_clock_moves_on_sleep() {
        let mut clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.sleep(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), 0.5);
        clock.reset();
        assert_eq!(clock.now(), 0.0);
    }
}
