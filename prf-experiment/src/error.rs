use std::path::PathBuf;

/// Fatal failures of a presentation run.
///
/// Collaborator errors arrive as `anyhow::Error` and are kept whole so the
/// alternate formatting shows their full context chain.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("render surface failed: {0:#}")]
    Surface(anyhow::Error),
    #[error("key polling failed: {0:#}")]
    Input(anyhow::Error),
    #[error("eye tracker failed during {step}: {error:#}")]
    Tracker {
        step: &'static str,
        error: anyhow::Error,
    },
    #[error("failed to write run log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn tracker(step: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| RunError::Tracker { step, error }
    }
}
