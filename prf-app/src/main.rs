mod cli;
mod config;
mod display;
mod loader;
mod tracker;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, EyeTrackerArg};
use config::AppConfig;
use display::WinitDisplay;
use log::{info, warn};
use prf_core::Stimulus;
use prf_experiment::{
    build_fixation, EyeTracker, HeadlessSurface, KeySource, PresentationScheduler, RunOutcome,
    RunStatus, ScriptedKeys, Surface,
};
use prf_timing::HighPrecisionTimer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use tracker::DummyEyeTracker;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| writeln!(buf, "[prf][{}] {}", record.level(), record.args()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config)?;

    let stimulus = loader::stimulus_source(cli.stimulus.as_deref())
        .load()
        .context("failed to load stimulus")?;
    info!(
        "Stimulus: {} frames of {}x{}, {:.1} s",
        stimulus.len(),
        stimulus.dimensions().1,
        stimulus.dimensions().0,
        stimulus.duration()
    );

    let tracker: Option<Box<dyn EyeTracker>> = match cli.eyetracker {
        EyeTrackerArg::None => None,
        EyeTrackerArg::Dummy => Some(Box::new(DummyEyeTracker::new(&cli.outdir))),
    };

    let outcome = if cli.headless {
        let [width, height] = config.display.headless_size;
        let keys = ScriptedKeys::new([[config.presenter.trigger_key.clone()]]);
        run(&cli, &config, &stimulus, HeadlessSurface::new(width, height), keys, tracker)?
    } else {
        let display = WinitDisplay::open(&config.display, &config.presenter.abort_key)?;
        let (surface, keys) = display.split();
        run(&cli, &config, &stimulus, surface, keys, tracker)?
    };

    report(&outcome);
    Ok(())
}

fn run<S: Surface, K: KeySource>(
    cli: &Cli,
    config: &AppConfig,
    stimulus: &Stimulus,
    surface: S,
    keys: K,
    tracker: Option<Box<dyn EyeTracker>>,
) -> Result<RunOutcome> {
    let (width, _) = surface.size();
    let fixation = match cli.seed {
        Some(seed) => build_fixation(&config.fixation, width, StdRng::seed_from_u64(seed)),
        None => build_fixation(&config.fixation, width, rand::rng()),
    };

    let mut scheduler = PresentationScheduler::new(
        config.presenter.clone(),
        stimulus,
        HighPrecisionTimer::new(),
        fixation,
        surface,
        keys,
    );
    if let Some(tracker) = tracker {
        scheduler = scheduler.with_eye_tracker(tracker);
    }
    Ok(scheduler.run(&cli.identity())?)
}

fn report(outcome: &RunOutcome) {
    match outcome.status {
        RunStatus::Completed => info!("Run completed: {} frames", outcome.frames_presented),
        RunStatus::Aborted => warn!("Run aborted after {} frames", outcome.frames_presented),
    }
    match &outcome.log_path {
        Some(path) => info!("Run log: {}", path.display()),
        None => info!("No run log written"),
    }
    if let Some(result) = &outcome.reaction {
        info!(
            "Hits: {}/{}, mean RT {:.3} s",
            result.hits, result.switches, result.mean_rt
        );
    }
    for (step, reason) in &outcome.teardown.failures {
        warn!("Teardown step '{}' failed: {}", step, reason);
    }
}
