//! Reproduces memory growth while dumping a large routing table.
//!
//! A run enters a fresh network namespace, installs a configurable number of
//! synthetic host routes on `lo`, and measures process heap usage around a
//! single full route dump. The OS primitives sit behind the traits in
//! [`NamespaceControl`], [`RouteTableFactory`], and [`MemoryProbe`].

mod config;
mod enumerate;
mod error;
mod memory;
mod namespace;
mod orchestrator;
mod populate;
mod report;
mod table;
#[cfg(test)]
mod testing;
mod types;

pub use config::{DEFAULT_INTERFACE, DEFAULT_ROUTE_COUNT, RunConfig};
pub use enumerate::{count_installed, list_routes};
pub use error::{BackendError, ProbeError, Result, RunError};
pub use memory::MemoryProbe;
pub use namespace::{NamespaceControl, NamespaceHandle};
pub use orchestrator::{RunState, run};
pub use populate::{HOST_PREFIX_LEN, HOST_ROUTE_FAMILY, host_route_destination, populate};
pub use report::Report;
pub use table::{RouteTable, RouteTableFactory};
pub use types::{
    AddressFamily, InterfaceRef, MemoryDelta, MemorySnapshot, NamespaceId, RouteOrigin,
    RouteRecord, RouteRequest,
};
