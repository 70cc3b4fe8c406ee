//! Sequences one reproduction run.
//!
//! ```text
//! Init → NamespaceSaved → NamespaceIsolated → SanityChecked → InterfaceUp
//!      → RoutesPopulated → SnapshotBefore → Enumerated → SnapshotAfter
//!      → Restored → Reported
//! ```
//!
//! Any failure ends the run with a [`RunError`]. Once the original namespace
//! has been captured, restoration is attempted on every path, and a
//! restoration failure never replaces the error (or report) already obtained.
//!
//! The caller must keep the whole run on one OS thread; see
//! [`NamespaceControl`]. A run that resumes on another thread is detected
//! before restoration and fails with [`ProbeError::ThreadMigrated`].

use std::fmt;
use std::thread::{self, ThreadId};

use tracing::{info, trace, warn};

use crate::config::RunConfig;
use crate::enumerate::{count_installed, list_routes};
use crate::error::{ProbeError, RunError};
use crate::memory::MemoryProbe;
use crate::namespace::{NamespaceControl, NamespaceHandle};
use crate::populate::{HOST_ROUTE_FAMILY, populate};
use crate::report::Report;
use crate::table::RouteTableFactory;
use crate::types::MemorySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    NamespaceSaved,
    NamespaceIsolated,
    SanityChecked,
    InterfaceUp,
    RoutesPopulated,
    SnapshotBefore,
    Enumerated,
    SnapshotAfter,
    Restored,
    Reported,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::NamespaceSaved => "namespace-saved",
            Self::NamespaceIsolated => "namespace-isolated",
            Self::SanityChecked => "sanity-checked",
            Self::InterfaceUp => "interface-up",
            Self::RoutesPopulated => "routes-populated",
            Self::SnapshotBefore => "snapshot-before",
            Self::Enumerated => "enumerated",
            Self::SnapshotAfter => "snapshot-after",
            Self::Restored => "restored",
            Self::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Tracks the current state so failures can name their phase.
struct Progress {
    state: RunState,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: RunState::Init,
        }
    }

    // trace! only: this runs between the two memory snapshots.
    fn advance(&mut self, next: RunState) {
        trace!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    fn fail(&self, phase: RunState, source: ProbeError) -> RunError {
        trace!(from = %self.state, %phase, "run failed");
        RunError { phase, source }
    }
}

/// Everything measured inside the isolated namespace.
struct Measurement {
    route_count: usize,
    routes_listed: usize,
    before: MemorySnapshot,
    after: MemorySnapshot,
}

/// Execute one run on the calling thread.
///
/// The returned future must be driven to completion on a single OS thread.
pub async fn run<N, M>(
    config: &RunConfig,
    namespaces: &N,
    tables: &dyn RouteTableFactory,
    memory: &M,
) -> Result<Report, RunError>
where
    N: NamespaceControl,
    M: MemoryProbe,
{
    let mut progress = Progress::new();
    let pinned = thread::current().id();

    info!("saving current netns");
    let original = namespaces
        .capture_current()
        .map_err(|e| progress.fail(RunState::NamespaceSaved, ProbeError::NamespaceQuery(e)))?;
    progress.advance(RunState::NamespaceSaved);

    info!(backend = tables.name(), "creating test netns");
    let outcome = match namespaces.create_isolated() {
        Ok(isolated) => {
            progress.advance(RunState::NamespaceIsolated);
            info!(original = %original.id(), test = %isolated.id(), "entered test netns");
            let measured = measure(&mut progress, config, tables, memory).await;
            let restored = restore_original(namespaces, &original, pinned);
            // The test handle is released here, after the thread has left it.
            drop(isolated);
            match (measured, restored) {
                (Ok(m), Ok(())) => Ok((m, true)),
                (Ok(m), Err(ProbeError::NamespaceRestore(_))) => Ok((m, false)),
                (Ok(_), Err(e)) => Err(progress.fail(RunState::Restored, e)),
                (Err(e), _) => Err(e),
            }
        }
        Err(e) => {
            let err = progress.fail(RunState::NamespaceIsolated, ProbeError::NamespaceCreate(e));
            // Best effort; `err` is what the caller needs to see.
            let _ = restore_original(namespaces, &original, pinned);
            Err(err)
        }
    };

    match outcome {
        Ok((m, restored)) => {
            if restored {
                progress.advance(RunState::Restored);
            }
            let report = Report::new(
                config.routes,
                m.route_count,
                m.routes_listed,
                m.before,
                m.after,
                restored,
            );
            progress.advance(RunState::Reported);
            info!(
                routes_inserted = report.routes_inserted,
                route_count = report.route_count,
                routes_listed = report.routes_listed,
                memory_delta_bytes = report.memory_delta.bytes(),
                memory_delta_mib = report.memory_delta_mib,
                restored,
                "run complete"
            );
            Ok(report)
        }
        Err(e) => {
            warn!(phase = %e.phase, error = %e.source, "run failed");
            Err(e)
        }
    }
}

/// Best-effort switch back to `original`, only from the thread that left it.
///
/// Failures are logged here. `NamespaceRestore` means the switch itself
/// failed; `ThreadMigrated` means it was not attempted.
fn restore_original<N: NamespaceControl>(
    namespaces: &N,
    original: &N::Handle,
    pinned: ThreadId,
) -> Result<(), ProbeError> {
    let current = thread::current().id();
    let result = if current != pinned {
        Err(ProbeError::ThreadMigrated {
            entered: format!("{pinned:?}"),
            resumed: format!("{current:?}"),
        })
    } else {
        info!(netns = %original.id(), "returning to original netns");
        namespaces
            .restore(original)
            .map_err(ProbeError::NamespaceRestore)
    };
    if let Err(err) = &result {
        warn!(error = %err, "restoration failed");
    }
    result
}

async fn measure<M: MemoryProbe>(
    progress: &mut Progress,
    config: &RunConfig,
    tables: &dyn RouteTableFactory,
    memory: &M,
) -> Result<Measurement, RunError> {
    // Netlink sockets bind to the namespace current at open time.
    let mut table = tables
        .open()
        .await
        .map_err(|e| progress.fail(RunState::SanityChecked, ProbeError::RouteTableOpen(e)))?;

    info!("sanity check that initial route list is empty");
    let initial = list_routes(table.as_mut(), HOST_ROUTE_FAMILY)
        .await
        .map_err(|e| progress.fail(RunState::SanityChecked, e))?;
    if !initial.is_empty() {
        let found = initial.len();
        return Err(progress.fail(RunState::SanityChecked, ProbeError::Precondition { found }));
    }
    progress.advance(RunState::SanityChecked);

    info!(interface = %config.interface, "grabbing handle to interface");
    let iface = table
        .interface_by_name(&config.interface)
        .await
        .map_err(|source| {
            let name = config.interface.clone();
            progress.fail(RunState::InterfaceUp, ProbeError::InterfaceLookup { name, source })
        })?;
    info!(interface = %iface.name, index = iface.index, "bringing interface up");
    table.set_interface_up(&iface).await.map_err(|source| {
        let name = iface.name.clone();
        progress.fail(RunState::InterfaceUp, ProbeError::InterfaceActivation { name, source })
    })?;
    progress.advance(RunState::InterfaceUp);

    populate(table.as_mut(), &iface, config.routes, config.table)
        .await
        .map_err(|e| progress.fail(RunState::RoutesPopulated, e))?;
    progress.advance(RunState::RoutesPopulated);

    info!("collecting memory stats and reading back routes");
    let before = memory
        .snapshot()
        .map_err(|e| progress.fail(RunState::SnapshotBefore, ProbeError::MemoryStats(e)))?;
    progress.advance(RunState::SnapshotBefore);

    let routes = list_routes(table.as_mut(), HOST_ROUTE_FAMILY)
        .await
        .map_err(|e| progress.fail(RunState::Enumerated, e))?;
    progress.advance(RunState::Enumerated);

    let after = memory
        .snapshot()
        .map_err(|e| progress.fail(RunState::SnapshotAfter, ProbeError::MemoryStats(e)))?;
    progress.advance(RunState::SnapshotAfter);

    let measurement = Measurement {
        route_count: count_installed(&routes),
        routes_listed: routes.len(),
        before,
        after,
    };
    info!(
        found = measurement.route_count,
        listed = measurement.routes_listed,
        "read back routes"
    );
    Ok(measurement)
}
