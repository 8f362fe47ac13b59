pub mod color;
pub mod event;
pub mod marker;
pub mod phase;
pub mod stimulus;

pub use color::{Color, ColorParseError};
pub use event::{ButtonPress, ColorSwitch, EventKind, FrameOnset, ScannerTrigger};
pub use marker::Marker;
pub use phase::{PhaseSignal, RunPhase};
pub use stimulus::{
    normalize_lut, FrameView, IndexedImageTable, Lut, Stimulus, StimulusError, StimulusSource,
};
