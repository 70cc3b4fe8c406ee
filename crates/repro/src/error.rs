use route_probe_nl::{BackendUnavailable, ProbeRunError};

#[derive(Debug, thiserror::Error)]
pub enum ReproError {
    #[error(transparent)]
    Prerequisites(#[from] BackendUnavailable),

    #[error(transparent)]
    Run(#[from] ProbeRunError),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ReproResult<T> = Result<T, ReproError>;
