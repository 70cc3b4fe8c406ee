use std::fmt;

use serde::Serialize;

use crate::types::{MemoryDelta, MemorySnapshot};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub routes_inserted: u32,
    /// Routes read back that were not installed by the kernel itself.
    pub route_count: usize,
    /// Every route the enumeration returned, all tables.
    pub routes_listed: usize,
    pub before: MemorySnapshot,
    pub after: MemorySnapshot,
    pub memory_delta: MemoryDelta,
    pub memory_delta_mib: i64,
    /// Whether the thread made it back to its original namespace.
    pub restored: bool,
}

impl Report {
    pub fn new(
        routes_inserted: u32,
        route_count: usize,
        routes_listed: usize,
        before: MemorySnapshot,
        after: MemorySnapshot,
        restored: bool,
    ) -> Self {
        let memory_delta = MemorySnapshot::delta(before, after);
        Self {
            routes_inserted,
            route_count,
            routes_listed,
            before,
            after,
            memory_delta,
            memory_delta_mib: memory_delta.mebibytes(),
            restored,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=============================")?;
        writeln!(f, "Found {} routes", self.route_count)?;
        write!(f, "Memory delta: {}", self.memory_delta)
    }
}
