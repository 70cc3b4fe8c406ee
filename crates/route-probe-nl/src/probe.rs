use route_probe::{Report, RunConfig};

use crate::error::ProbeRunError;
use crate::jemalloc::JemallocProbe;
use crate::netlink::NetlinkTables;
use crate::netns::LinuxNamespaces;
use crate::pinned::run_pinned;

const PROBE_THREAD: &str = "route-probe";

/// Run once against the live kernel on a dedicated thread.
///
/// The namespace switch happens on that thread only, so this is safe to call
/// from anywhere, including a task on a multi-threaded runtime. Blocks until
/// the run has finished and the thread has exited.
pub fn run(config: &RunConfig) -> Result<Report, ProbeRunError> {
    let config = config.clone();
    let report = run_pinned(PROBE_THREAD, move || async move {
        route_probe::run(&config, &LinuxNamespaces, &NetlinkTables, &JemallocProbe).await
    })??;
    Ok(report)
}
