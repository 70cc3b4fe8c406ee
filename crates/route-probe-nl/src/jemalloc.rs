use route_probe::{BackendError, MemoryProbe, MemorySnapshot};
use tikv_jemalloc_ctl::{epoch, stats};

/// Process heap usage as reported by jemalloc's `stats.allocated`.
///
/// Only meaningful when jemalloc is the global allocator, which linking this
/// crate arranges.
#[derive(Debug, Default, Clone, Copy)]
pub struct JemallocProbe;

impl MemoryProbe for JemallocProbe {
    fn snapshot(&self) -> Result<MemorySnapshot, BackendError> {
        // Statistics are cached until the epoch advances.
        epoch::advance().map_err(|e| BackendError::new("advance jemalloc epoch", e))?;
        let allocated =
            stats::allocated::read().map_err(|e| BackendError::new("read stats.allocated", e))?;
        let heap_bytes =
            u64::try_from(allocated).map_err(|e| BackendError::new("convert stats.allocated", e))?;
        Ok(MemorySnapshot { heap_bytes })
    }
}
