use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Times are seconds since the run clock epoch (scanner trigger receipt).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameOnset {
    pub time: f64,
    pub frame_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSwitch {
    pub time: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonPress {
    pub time: f64,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScannerTrigger {
    pub time: f64,
}

/// Kinds of rows in the persisted run log.
///
/// Declaration order is the tie-break order for events sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FrameOnset,
    #[serde(rename = "fixation_color_switch")]
    ColorSwitch,
    ButtonPress,
    ScannerTrigger,
    Result,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FrameOnset => "frame_onset",
            EventKind::ColorSwitch => "fixation_color_switch",
            EventKind::ButtonPress => "button_press",
            EventKind::ScannerTrigger => "scanner_trigger",
            EventKind::Result => "result",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
