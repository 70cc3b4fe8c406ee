use std::fmt;

use crate::orchestrator::RunState;

/// Opaque failure reported by an OS-level primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{op}: {detail}")]
pub struct BackendError {
    pub op: String,
    pub detail: String,
}

impl BackendError {
    pub fn new(op: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self {
            op: op.into(),
            detail: detail.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to get original netns: {0}")]
    NamespaceQuery(BackendError),

    #[error("failed to create new netns: {0}")]
    NamespaceCreate(BackendError),

    #[error("failed to return to original netns: {0}")]
    NamespaceRestore(BackendError),

    #[error("failed to open route table: {0}")]
    RouteTableOpen(BackendError),

    #[error("initial route list not empty: found {found} routes")]
    Precondition { found: usize },

    #[error("failed to grab handle to {name}: {source}")]
    InterfaceLookup { name: String, source: BackendError },

    #[error("failed to bring {name} up: {source}")]
    InterfaceActivation { name: String, source: BackendError },

    #[error("failed to add route {index}: {source}")]
    RouteInsert { index: u32, source: BackendError },

    #[error("failed to list routes: {0}")]
    RouteList(BackendError),

    #[error("failed to read memory stats: {0}")]
    MemoryStats(BackendError),

    /// The run resumed on a different OS thread than the one that entered
    /// the test namespace. That thread was left inside it.
    #[error("run moved from thread {entered} to thread {resumed}; original netns not restored")]
    ThreadMigrated { entered: String, resumed: String },
}

/// A [`ProbeError`] tagged with the run phase that failed. This is the
/// run's failed terminal state.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct RunError {
    /// The state the run was moving into when the error occurred.
    pub phase: RunState,
    pub source: ProbeError,
}

pub type Result<T> = std::result::Result<T, ProbeError>;
