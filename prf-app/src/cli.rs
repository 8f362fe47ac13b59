use crate::config::AppConfig;
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use prf_core::Color;
use prf_experiment::{FixationKind, RunIdentity};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FixationArg {
    Dot,
    Cross,
    AbcTarget,
}

impl From<FixationArg> for FixationKind {
    fn from(arg: FixationArg) -> Self {
        match arg {
            FixationArg::Dot => FixationKind::Dot,
            FixationArg::Cross => FixationKind::Cross,
            FixationArg::AbcTarget => FixationKind::AbcTarget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EyeTrackerArg {
    #[default]
    None,
    /// Records markers to a TSV file next to the run log; no hardware needed.
    Dummy,
}

#[derive(Parser, Debug)]
#[command(
    name = "prf-present",
    about = "Scanner-synchronized stimulus presentation for pRF mapping"
)]
pub struct Cli {
    #[arg(long, short = 's')]
    pub subject: String,

    #[arg(long, default_value = "01")]
    pub session: String,

    #[arg(long, short = 'r', default_value = "01")]
    pub run: String,

    /// Directory the run log is written to.
    #[arg(long, default_value = "logs")]
    pub outdir: PathBuf,

    /// JSON stimulus file with `images`, `seq`, `cmap` and a frame timing.
    #[arg(long, required_unless_present = "demo_bars", conflicts_with = "demo_bars")]
    pub stimulus: Option<PathBuf>,

    /// Present a generated checkerboard bar sweep instead of a stimulus file.
    #[arg(long)]
    pub demo_bars: bool,

    /// JSON file with presenter, fixation and display settings.
    #[arg(long, env = "PRF_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub fixation: Option<FixationArg>,

    /// Two fixation colors, e.g. `magenta,green` or `#ff00ff,#008000`.
    #[arg(long, value_delimiter = ',')]
    pub colors: Option<Vec<Color>>,

    /// Per-frame probability of a fixation color switch.
    #[arg(long)]
    pub switch_prob: Option<f64>,

    /// Minimum seconds between two color switches.
    #[arg(long)]
    pub min_switch_interval: Option<f64>,

    /// Fixation size in pixels (dot diameter or cross extent).
    #[arg(long)]
    pub fixation_size: Option<f32>,

    /// Seed for the fixation color-switch draws.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub trigger_key: Option<String>,

    #[arg(long)]
    pub abort_key: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub response_keys: Option<Vec<String>>,

    /// Log progress every this many frames (0 disables).
    #[arg(long)]
    pub frame_log_interval: Option<usize>,

    /// Seconds the completion screen stays up.
    #[arg(long)]
    pub end_screen_wait: Option<f64>,

    /// Monitor index to present on.
    #[arg(long)]
    pub screen: Option<usize>,

    #[arg(long, value_enum, default_value_t = EyeTrackerArg::None)]
    pub eyetracker: EyeTrackerArg,

    #[arg(long)]
    pub tracker_endpoint: Option<String>,

    /// Run without a window; the trigger fires on the first poll.
    #[arg(long)]
    pub headless: bool,

    /// TrueType font used for on-screen messages.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn identity(&self) -> RunIdentity {
        RunIdentity {
            subject: self.subject.clone(),
            session: self.session.clone(),
            run: self.run.clone(),
            outdir: self.outdir.clone(),
        }
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        let presenter = &mut config.presenter;
        if let Some(key) = &self.trigger_key {
            presenter.trigger_key = key.clone();
        }
        if let Some(key) = &self.abort_key {
            presenter.abort_key = key.clone();
        }
        if let Some(keys) = &self.response_keys {
            presenter.response_keys = keys.clone();
        }
        if let Some(n) = self.frame_log_interval {
            presenter.frame_log_interval = n;
        }
        if let Some(wait) = self.end_screen_wait {
            presenter.end_screen_wait = wait;
        }
        if let Some(endpoint) = &self.tracker_endpoint {
            presenter.tracker_endpoint = endpoint.clone();
        }

        let fixation = &mut config.fixation;
        if let Some(kind) = self.fixation {
            fixation.kind = kind.into();
        }
        if let Some(colors) = &self.colors {
            let [a, b] = colors.as_slice() else {
                bail!("--colors needs exactly two colors");
            };
            fixation.colors = [a.clone(), b.clone()];
        }
        if let Some(p) = self.switch_prob {
            fixation.color_switch_prob = p;
        }
        if let Some(interval) = self.min_switch_interval {
            fixation.min_switch_interval = interval;
        }
        if self.fixation_size.is_some() {
            fixation.size = self.fixation_size;
        }

        if let Some(screen) = self.screen {
            config.display.screen = screen;
        }
        if self.font.is_some() {
            config.display.font = self.font.clone();
        }
        config.validate()
    }
}
