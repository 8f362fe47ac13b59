use anyhow::{bail, Context, Result};
use log::info;
use prf_experiment::{FixationConfig, PresenterConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Index into the available monitors; falls back to the primary one.
    pub screen: usize,
    /// Canvas size used by `--headless` runs.
    pub headless_size: [u32; 2],
    pub font: Option<PathBuf>,
    pub text_size: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screen: 0,
            headless_size: [1920, 1080],
            font: None,
            text_size: 32.0,
        }
    }
}

/// Everything `--config` may provide; command-line flags win over it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub presenter: PresenterConfig,
    pub fixation: FixationConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.presenter;
        if p.trigger_key == p.abort_key {
            bail!("trigger and abort key are both '{}'", p.trigger_key);
        }
        if p.response_keys.iter().any(|k| *k == p.trigger_key || *k == p.abort_key) {
            bail!("response keys must not include the trigger or abort key");
        }
        let prob = self.fixation.color_switch_prob;
        if !(0.0..=1.0).contains(&prob) {
            bail!("color switch probability {} is outside [0, 1]", prob);
        }
        let window = p.reaction_window;
        if window.min_rt > window.max_rt {
            bail!(
                "reaction window min {} exceeds max {}",
                window.min_rt,
                window.max_rt
            );
        }
        if p.end_screen_wait < 0.0 || !p.end_screen_wait.is_finite() {
            bail!("end screen wait must be a non-negative number of seconds");
        }
        Ok(())
    }
}
