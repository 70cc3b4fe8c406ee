//! Linux backends for `route-probe`.
//!
//! Namespaces via `unshare(2)`/`setns(2)`, route tables via rtnetlink, and
//! heap statistics via jemalloc. Linking this crate installs jemalloc as the
//! global allocator so that [`JemallocProbe`] sees every allocation.
//!
//! [`run`] is the entry point: it pins a whole run to one dedicated thread.

mod error;
mod jemalloc;
mod netlink;
mod netns;
mod pinned;
mod prerequisites;
mod probe;

#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub use error::{BackendUnavailable, PinnedError, ProbeRunError};
pub use jemalloc::JemallocProbe;
pub use netlink::{NetlinkTable, NetlinkTables};
pub use netns::{LinuxNamespaces, NetnsHandle, THREAD_NETNS_PATH};
pub use pinned::run_pinned;
pub use prerequisites::check_prerequisites;
pub use probe::run;
