use crate::error::BackendError;
use crate::types::MemorySnapshot;

/// Source of process-wide heap statistics.
pub trait MemoryProbe {
    fn snapshot(&self) -> Result<MemorySnapshot, BackendError>;
}
