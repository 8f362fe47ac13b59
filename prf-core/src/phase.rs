/// Lifecycle of a single presentation run.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    AwaitingTrigger,
    Presenting,
    Completed,
    Aborted,
    /// A collaborator error ended the run early.
    Failed,
    TearingDown,
}

/// Inputs that move a run between phases.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum PhaseSignal {
    Trigger,
    Abort,
    FramesExhausted,
    Fail,
    Finished,
}

impl RunPhase {
    /// Next phase for `signal`, or `None` when the signal does not apply here.
    pub fn transition(&self, signal: PhaseSignal) -> Option<Self> {
        use PhaseSignal::*;
        use RunPhase::*;
        match (self, signal) {
            (AwaitingTrigger, Trigger) => Some(Presenting),
            (AwaitingTrigger | Presenting, Abort) => Some(Aborted),
            (Presenting, FramesExhausted) => Some(Completed),
            (AwaitingTrigger | Presenting | Completed | Aborted, Fail) => Some(Failed),
            (Completed | Aborted | Failed, Finished) => Some(TearingDown),
            _ => None,
        }
    }
}
