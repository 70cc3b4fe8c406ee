use thiserror::Error;

/// The host cannot run a probe. Lists every failed check.
#[derive(Debug, Error)]
#[error("backend not available: {0}")]
pub struct BackendUnavailable(pub String);

/// Failures of [`run_pinned`](crate::run_pinned) itself, as opposed to the
/// work it runs.
#[derive(Debug, Error)]
pub enum PinnedError {
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build runtime on {name}: {source}")]
    Runtime {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {name} panicked: {message}")]
    Panicked { name: String, message: String },
}

/// Failure of a full run started through [`run`](crate::run).
#[derive(Debug, Error)]
pub enum ProbeRunError {
    #[error(transparent)]
    Pinned(#[from] PinnedError),

    #[error(transparent)]
    Run(#[from] route_probe::RunError),
}
