pub mod config;
pub mod error;
pub mod fixation;
pub mod input;
pub mod reaction;
pub mod recorder;
pub mod run_log;
pub mod scheduler;
pub mod surface;
pub mod teardown;
pub mod tracker;

pub use config::{AbcGeometry, FixationConfig, FixationKind, PresenterConfig, RunIdentity};
pub use error::RunError;
pub use fixation::{build_fixation, AbcTargetFixation, ColorSwitchFixation, Fixation, FixationShape};
pub use input::{InputGate, InputSample, KeySource, KeySnapshot, ScriptedKeys, WaitSignal};
pub use reaction::{analyze_reaction_times, ReactionTimeResult, ReactionWindow};
pub use recorder::{EventRecorder, LogEntry, RunEventLog};
pub use scheduler::{PresentationScheduler, RunOutcome, RunStatus};
pub use surface::{HeadlessSurface, Surface, SurfaceCounters, SurfaceProbe};
pub use teardown::{SurfaceGuard, TeardownReport, TrackerGuard};
pub use tracker::EyeTracker;
