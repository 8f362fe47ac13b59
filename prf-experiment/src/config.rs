use crate::reaction::ReactionWindow;
use prf_core::Color;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Presentation parameters supplied by the caller; validated before they get here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub trigger_key: String,
    pub abort_key: String,
    pub response_keys: Vec<String>,
    /// Log progress every this many frames; 0 disables.
    pub frame_log_interval: usize,
    /// Seconds the completion screen stays up.
    pub end_screen_wait: f64,
    pub reaction_window: ReactionWindow,
    pub tracker_endpoint: String,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            trigger_key: "6".to_string(),
            abort_key: "escape".to_string(),
            response_keys: ["1", "2", "3", "4"].map(String::from).to_vec(),
            frame_log_interval: 100,
            end_screen_wait: 2.0,
            reaction_window: ReactionWindow::default(),
            tracker_endpoint: "100.1.1.1".to_string(),
        }
    }
}

/// Who and what a run is for; drives the log file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunIdentity {
    pub subject: String,
    pub session: String,
    pub run: String,
    pub outdir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FixationKind {
    #[default]
    Dot,
    Cross,
    AbcTarget,
}

/// Viewing geometry for the ABC target, in centimetres and degrees of visual angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcGeometry {
    pub screen_width_cm: f64,
    pub viewing_distance_cm: f64,
    pub outer_diameter_deg: f64,
    pub inner_diameter_deg: f64,
    pub oval_color: Color,
    pub cross_color: Color,
}

impl Default for AbcGeometry {
    fn default() -> Self {
        Self {
            screen_width_cm: 39.0,
            viewing_distance_cm: 60.0,
            outer_diameter_deg: 0.6,
            inner_diameter_deg: 0.1,
            oval_color: Color::rgb([0, 0, 0]),
            cross_color: Color::rgb([255, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixationConfig {
    pub kind: FixationKind,
    /// Dot diameter or cross extent in pixels; `None` picks the shape's default.
    pub size: Option<f32>,
    pub colors: [Color; 2],
    pub color_switch_prob: f64,
    /// Seconds; values <= 0 make every presented frame eligible.
    pub min_switch_interval: f64,
    pub abc: AbcGeometry,
}

impl Default for FixationConfig {
    fn default() -> Self {
        Self {
            kind: FixationKind::Dot,
            size: None,
            colors: [
                Color::named("magenta").unwrap_or_else(|| Color::rgb([255, 0, 255])),
                Color::named("green").unwrap_or_else(|| Color::rgb([0, 128, 0])),
            ],
            color_switch_prob: 0.01,
            min_switch_interval: 2.0,
            abc: AbcGeometry::default(),
        }
    }
}

impl FixationConfig {
    pub fn size_px(&self) -> f32 {
        self.size.unwrap_or(match self.kind {
            FixationKind::Dot => 8.0,
            FixationKind::Cross => 30.0,
            FixationKind::AbcTarget => 0.0,
        })
    }
}
