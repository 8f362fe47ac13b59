use anyhow::{bail, Context, Result};
use log::{debug, info};
use prf_experiment::{EyeTracker, Surface};
use prf_timing::{Clock, HighPrecisionTimer};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Eye tracker stand-in for rigs without the hardware.
///
/// Markers are timestamped against its own monotonic clock and written to
/// `<log stem>_eyetrack.tsv` in the output directory on download.
pub struct DummyEyeTracker {
    outdir: PathBuf,
    timer: HighPrecisionTimer,
    connected: bool,
    recording: bool,
    messages: Vec<(f64, String)>,
}

impl DummyEyeTracker {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
            timer: HighPrecisionTimer::new(),
            connected: false,
            recording: false,
            messages: Vec::new(),
        }
    }

    pub fn data_path(&self, name_hint: &str) -> PathBuf {
        let stem = Path::new(name_hint)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string());
        self.outdir.join(format!("{}_eyetrack.tsv", stem))
    }

    fn ensure_connected(&self, step: &str) -> Result<()> {
        if !self.connected {
            bail!("{} before connect", step);
        }
        Ok(())
    }
}

impl EyeTracker for DummyEyeTracker {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        info!("Dummy eye tracker standing in for {}", endpoint);
        self.timer.reset();
        self.connected = true;
        Ok(())
    }

    fn calibrate(&mut self, surface: &mut dyn Surface) -> Result<()> {
        self.ensure_connected("calibrate")?;
        surface.show_message("Eye tracker calibration (dummy)")?;
        surface.present()
    }

    fn drift_correction(&mut self) -> Result<()> {
        self.ensure_connected("drift correction")?;
        debug!("Dummy drift correction");
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        self.ensure_connected("start recording")?;
        self.recording = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.recording = false;
        Ok(())
    }

    fn send_message(&mut self, text: &str) -> Result<()> {
        self.ensure_connected("message")?;
        if !self.recording {
            debug!("Eye tracker message while not recording: {}", text);
        }
        self.messages.push((self.timer.now(), text.to_string()));
        Ok(())
    }

    fn download_data(&mut self, name_hint: &str) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        let path = self.data_path(name_hint);
        fs::create_dir_all(&self.outdir)
            .with_context(|| format!("failed to create {}", self.outdir.display()))?;
        let file = fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "Time\tMessage")?;
        for (time, text) in &self.messages {
            writeln!(out, "{}\t{}", time, text)?;
        }
        out.flush()?;
        info!("Eye tracking data saved: {}", path.display());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.recording = false;
        Ok(())
    }
}
