use crate::config::{PresenterConfig, RunIdentity};
use crate::error::RunError;
use crate::fixation::Fixation;
use crate::input::{InputGate, KeySource, WaitSignal};
use crate::reaction::{analyze_reaction_times, ReactionTimeResult};
use crate::recorder::{EventRecorder, RunEventLog};
use crate::run_log;
use crate::surface::Surface;
use crate::teardown::{SurfaceGuard, TeardownReport, TrackerGuard};
use crate::tracker::EyeTracker;
use log::{debug, error, info};
use prf_core::{PhaseSignal, RunPhase, Stimulus};
use prf_timing::{Clock, FrameIntervals, FrameTimingStats};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sleep between polls when no frame is due.
const POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Pause after the waiting screen before key polling starts.
const TRIGGER_SETTLE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub frames_presented: usize,
    pub log: RunEventLog,
    /// Only computed for completed runs.
    pub reaction: Option<ReactionTimeResult>,
    /// `None` when the run was aborted before the scanner trigger.
    pub log_path: Option<PathBuf>,
    pub timing: FrameTimingStats,
    pub teardown: TeardownReport,
    /// Every phase the run passed through, ending in `TearingDown`.
    pub phases: Vec<RunPhase>,
}

/// Single-threaded presentation loop for one run.
///
/// Waits for the scanner trigger, shows each frame once its absolute due time
/// `index * frame_duration` has passed, samples keys every tick and tears down
/// the surface and eye tracker on every exit path.
pub struct PresentationScheduler<'a, C, F, S, K>
where
    C: Clock,
    F: Fixation,
    S: Surface,
    K: KeySource,
{
    config: PresenterConfig,
    stimulus: &'a Stimulus,
    clock: C,
    fixation: F,
    surface: SurfaceGuard<S>,
    keys: K,
    tracker: TrackerGuard,
    gate: InputGate,
    recorder: EventRecorder,
    intervals: FrameIntervals,
    phase: RunPhase,
    phases: Vec<RunPhase>,
    frame_index: usize,
}

impl<'a, C, F, S, K> PresentationScheduler<'a, C, F, S, K>
where
    C: Clock,
    F: Fixation,
    S: Surface,
    K: KeySource,
{
    pub fn new(
        config: PresenterConfig,
        stimulus: &'a Stimulus,
        clock: C,
        fixation: F,
        surface: S,
        keys: K,
    ) -> Self {
        let gate = InputGate::from_config(&config);
        let recorder = EventRecorder::new(&config.trigger_key);
        Self {
            config,
            stimulus,
            clock,
            fixation,
            surface: SurfaceGuard::new(surface),
            keys,
            tracker: TrackerGuard::new(None),
            gate,
            recorder,
            intervals: FrameIntervals::default(),
            phase: RunPhase::default(),
            phases: vec![RunPhase::default()],
            frame_index: 0,
        }
    }

    pub fn with_eye_tracker(mut self, tracker: Box<dyn EyeTracker>) -> Self {
        self.tracker = TrackerGuard::new(Some(tracker));
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run to completion or abort, then tear down.
    ///
    /// Errors are returned only after teardown has been attempted.
    pub fn run(mut self, identity: &RunIdentity) -> Result<RunOutcome, RunError> {
        let path = run_log::log_path(identity, chrono::Local::now().naive_local());
        if let Some(name) = path.file_name() {
            self.tracker.set_data_name(name.to_string_lossy());
        }

        let result = self.execute(identity, &path);
        if let Err(e) = &result {
            error!("Exception during run: {}", e);
            self.transition(PhaseSignal::Fail);
        }

        self.transition(PhaseSignal::Finished);
        let mut report = TeardownReport::default();
        self.surface.release(&mut report);
        self.tracker.release(&mut report);

        let phases = std::mem::take(&mut self.phases);
        result.map(|mut outcome| {
            outcome.teardown = report;
            outcome.phases = phases;
            outcome
        })
    }

    fn execute(&mut self, identity: &RunIdentity, path: &Path) -> Result<RunOutcome, RunError> {
        self.setup_tracker(identity)?;

        let prompt = format!(
            "Waiting for scanner...\nPress '{}' to begin",
            self.config.trigger_key
        );
        self.surface.show_message(&prompt).map_err(RunError::Surface)?;
        self.surface.present().map_err(RunError::Surface)?;
        self.clock.sleep(TRIGGER_SETTLE);
        info!("Awaiting scanner trigger...");

        if self.await_trigger()? == WaitSignal::Abort {
            self.transition(PhaseSignal::Abort);
            info!("Aborted by user.");
            return Ok(self.outcome(RunStatus::Aborted, RunEventLog::default(), None, None));
        }
        self.transition(PhaseSignal::Trigger);
        info!("Scanner trigger received, starting presentation.");

        self.clock.reset();
        if let Some(tracker) = self.tracker.get_mut() {
            tracker
                .send_message("stimulus_onset")
                .map_err(RunError::tracker("stimulus onset marker"))?;
        }

        self.present_frames()?;
        self.report_timing();

        if self.phase == RunPhase::Aborted {
            let log = self.recorder.merge(self.fixation.switch_log());
            run_log::write_run_log(path, &log)?;
            info!("Saved partial timing log: {}", path.display());
            return Ok(self.outcome(RunStatus::Aborted, log, None, Some(path.to_path_buf())));
        }

        self.surface
            .show_message("Experiment complete.\nThank you!")
            .map_err(RunError::Surface)?;
        self.surface.present().map_err(RunError::Surface)?;
        self.clock
            .sleep(Duration::from_secs_f64(self.config.end_screen_wait.max(0.0)));

        let mut log = self.recorder.merge(self.fixation.switch_log());
        let window = self.config.reaction_window;
        let reaction =
            analyze_reaction_times(self.fixation.switch_log(), self.recorder.buttons(), window);
        for line in reaction.summary(&window) {
            info!("{}", line);
            log.push_result(line);
        }
        run_log::write_run_log(path, &log)?;
        info!("Saved timing log: {}", path.display());

        Ok(self.outcome(
            RunStatus::Completed,
            log,
            Some(reaction),
            Some(path.to_path_buf()),
        ))
    }

    fn setup_tracker(&mut self, identity: &RunIdentity) -> Result<(), RunError> {
        let Some(tracker) = self.tracker.get_mut() else {
            return Ok(());
        };
        info!("Setting up eye tracker");
        tracker
            .connect(&self.config.tracker_endpoint)
            .map_err(RunError::tracker("connect"))?;
        tracker
            .calibrate(&mut *self.surface)
            .map_err(RunError::tracker("calibration"))?;
        tracker
            .drift_correction()
            .map_err(RunError::tracker("drift correction"))?;
        tracker
            .start_recording()
            .map_err(RunError::tracker("start recording"))?;
        tracker
            .send_message(&format!(
                "EXPERIMENT_START {} {} {}",
                identity.subject, identity.session, identity.run
            ))
            .map_err(RunError::tracker("experiment start marker"))?;
        Ok(())
    }

    fn await_trigger(&mut self) -> Result<WaitSignal, RunError> {
        loop {
            let keys = self.keys.pressed_keys().map_err(RunError::Input)?;
            match self.gate.wait_signal(&keys) {
                WaitSignal::Idle => self.clock.sleep(POLL_INTERVAL),
                signal => return Ok(signal),
            }
        }
    }

    fn present_frames(&mut self) -> Result<(), RunError> {
        let total = self.stimulus.len();
        let frame_duration = self.stimulus.frame_duration();
        self.gate.reset();

        while self.frame_index < total {
            let keys = self.keys.pressed_keys().map_err(RunError::Input)?;
            let sample = self.gate.sample(&keys);
            if sample.abort {
                info!("Aborted by user.");
                self.transition(PhaseSignal::Abort);
                return Ok(());
            }

            let t = self.clock.now();
            if sample.trigger {
                self.recorder.scanner_trigger(t);
                if let Some(tracker) = self.tracker.get_mut() {
                    tracker
                        .send_message("scanner_trigger")
                        .map_err(RunError::tracker("scanner trigger marker"))?;
                }
            }
            for key in sample.presses {
                self.recorder.button_press(t, key);
            }

            // Due times are absolute, so a late frame is shown immediately and
            // the next one is not pushed back.
            if t >= self.frame_index as f64 * frame_duration {
                self.show_frame(t)?;
            } else {
                self.clock.sleep(POLL_INTERVAL);
            }
        }

        self.transition(PhaseSignal::FramesExhausted);
        Ok(())
    }

    fn show_frame(&mut self, t: f64) -> Result<(), RunError> {
        let frame = self.stimulus.frame(self.frame_index);
        self.surface.draw_frame(frame).map_err(RunError::Surface)?;
        self.fixation.update(Some(t));
        self.fixation
            .draw(&mut *self.surface)
            .map_err(RunError::Surface)?;
        self.surface.present().map_err(RunError::Surface)?;

        self.recorder.frame_onset(t, self.frame_index);
        self.intervals.record_onset(t);
        self.frame_index += 1;

        let every = self.config.frame_log_interval;
        if every > 0 && self.frame_index % every == 0 {
            info!("Presented frame {}/{}", self.frame_index, self.stimulus.len());
        }
        Ok(())
    }

    fn report_timing(&self) {
        let stats = self.intervals.stats();
        if stats.samples == 0 {
            return;
        }
        info!(
            "Frame timing: {:.3} ms/frame, {:.1} Hz, jitter {:.3} ms, max {:.3} ms",
            stats.average_frame_time_ns / 1_000_000.0,
            stats.effective_fps,
            stats.jitter_ns / 1_000_000.0,
            stats.max_frame_time_ns / 1_000_000.0,
        );
    }

    fn transition(&mut self, signal: PhaseSignal) {
        if let Some(next) = self.phase.transition(signal) {
            debug!("Run phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            self.phases.push(next);
        }
    }

    fn outcome(
        &self,
        status: RunStatus,
        log: RunEventLog,
        reaction: Option<ReactionTimeResult>,
        log_path: Option<PathBuf>,
    ) -> RunOutcome {
        RunOutcome {
            status,
            frames_presented: self.frame_index,
            log,
            reaction,
            log_path,
            timing: self.intervals.stats(),
            teardown: TeardownReport::default(),
            phases: Vec::new(),
        }
    }
}
