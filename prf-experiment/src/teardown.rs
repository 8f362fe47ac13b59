use crate::surface::Surface;
use crate::tracker::EyeTracker;
use anyhow::Result;
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Cleanup steps that failed while a run was being torn down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeardownReport {
    pub surface_closed: bool,
    pub tracker_steps: usize,
    pub failures: Vec<(&'static str, String)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn attempt(&mut self, step: &'static str, result: Result<()>) {
        match result {
            Ok(()) => debug!("Teardown step '{}' done", step),
            Err(e) => {
                warn!("Teardown step '{}' failed: {:#}", step, e);
                self.failures.push((step, format!("{:#}", e)));
            }
        }
    }
}

/// Owns the render surface and closes it exactly once, on every exit path.
pub struct SurfaceGuard<S: Surface> {
    surface: S,
    released: bool,
}

impl<S: Surface> SurfaceGuard<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            released: false,
        }
    }

    pub fn release(&mut self, report: &mut TeardownReport) {
        if self.released {
            return;
        }
        self.released = true;
        let result = self.surface.close();
        report.surface_closed = result.is_ok();
        report.attempt("close surface", result);
    }
}

impl<S: Surface> Deref for SurfaceGuard<S> {
    type Target = S;
    fn deref(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> DerefMut for SurfaceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: Surface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        if !self.released {
            self.release(&mut TeardownReport::default());
        }
    }
}

/// Owns the optional eye tracker and runs its shutdown sequence exactly once.
///
/// Each shutdown step is attempted even when an earlier one failed.
pub struct TrackerGuard {
    tracker: Option<Box<dyn EyeTracker>>,
    data_name: String,
    released: bool,
}

impl TrackerGuard {
    pub fn new(tracker: Option<Box<dyn EyeTracker>>) -> Self {
        Self {
            tracker,
            data_name: String::new(),
            released: false,
        }
    }

    /// Name hint handed to `download_data` at shutdown.
    pub fn set_data_name(&mut self, name: impl Into<String>) {
        self.data_name = name.into();
    }

    pub fn get_mut(&mut self) -> Option<&mut (dyn EyeTracker + 'static)> {
        self.tracker.as_deref_mut()
    }

    pub fn release(&mut self, report: &mut TeardownReport) {
        if self.released {
            return;
        }
        self.released = true;
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return;
        };
        report.attempt("send stimulus_end", tracker.send_message("stimulus_end"));
        report.attempt("stop recording", tracker.stop_recording());
        report.attempt("download data", tracker.download_data(&self.data_name));
        report.attempt("close tracker", tracker.close());
        report.tracker_steps += 4;
    }
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        if !self.released {
            self.release(&mut TeardownReport::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FlakyTracker {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl EyeTracker for FlakyTracker {
        fn connect(&mut self, _endpoint: &str) -> Result<()> {
            Ok(())
        }
        fn calibrate(&mut self, _surface: &mut dyn Surface) -> Result<()> {
            Ok(())
        }
        fn drift_correction(&mut self) -> Result<()> {
            Ok(())
        }
        fn start_recording(&mut self) -> Result<()> {
            Ok(())
        }
        fn stop_recording(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("stop".into());
            bail!("link lost")
        }
        fn send_message(&mut self, text: &str) -> Result<()> {
            self.calls.borrow_mut().push(text.into());
            bail!("link lost")
        }
        fn download_data(&mut self, name_hint: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("download {}", name_hint));
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("close".into());
            Ok(())
        }
    }

    #[test]
    fn tracker_steps_run_despite_failures() {
        let tracker = FlakyTracker::default();
        let calls = tracker.calls.clone();
        let mut guard = TrackerGuard::new(Some(Box::new(tracker)));
        guard.set_data_name("run.tsv");

        let mut report = TeardownReport::default();
        guard.release(&mut report);
        guard.release(&mut report);
        drop(guard);

        assert_eq!(
            *calls.borrow(),
            ["stimulus_end", "stop", "download run.tsv", "close"]
        );
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.tracker_steps, 4);
    }

    #[test]
    fn surface_closes_once_even_when_dropped() {
        let surface = HeadlessSurface::new(10, 10);
        let probe = surface.probe();
        let mut guard = SurfaceGuard::new(surface);
        let mut report = TeardownReport::default();
        guard.release(&mut report);
        drop(guard);
        assert_eq!(probe.snapshot().close_calls, 1);
        assert!(report.surface_closed);
        assert!(report.is_clean());
    }

    #[test]
    fn unreleased_surface_closes_on_drop() {
        let surface = HeadlessSurface::new(10, 10);
        let probe = surface.probe();
        drop(SurfaceGuard::new(surface));
        assert_eq!(probe.snapshot().close_calls, 1);
    }
}
