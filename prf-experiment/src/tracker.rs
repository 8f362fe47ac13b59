use crate::surface::Surface;
use anyhow::Result;

/// Eye-tracking device driven by the scheduler around a run.
///
/// Call order: `connect`, `calibrate`, `drift_correction`, `start_recording`,
/// any number of `send_message`, then `stop_recording`, `download_data`, `close`.
pub trait EyeTracker {
    fn connect(&mut self, endpoint: &str) -> Result<()>;
    fn calibrate(&mut self, surface: &mut dyn Surface) -> Result<()>;
    fn drift_correction(&mut self) -> Result<()>;
    fn start_recording(&mut self) -> Result<()>;
    fn stop_recording(&mut self) -> Result<()>;
    /// Timestamped marker in the device's own data stream.
    fn send_message(&mut self, text: &str) -> Result<()>;
    /// Pull the recorded data file next to the run log named `name_hint`.
    fn download_data(&mut self, name_hint: &str) -> Result<()>;
    /// Drop the device link; safe to call more than once.
    fn close(&mut self) -> Result<()>;
}
