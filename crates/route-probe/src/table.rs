use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{AddressFamily, InterfaceRef, RouteRecord, RouteRequest};

/// Routing primitives bound to the namespace that was current when the
/// table was opened.
#[async_trait]
pub trait RouteTable: Send {
    async fn interface_by_name(&mut self, name: &str) -> Result<InterfaceRef, BackendError>;
    async fn set_interface_up(&mut self, iface: &InterfaceRef) -> Result<(), BackendError>;
    async fn add_route(&mut self, route: &RouteRequest) -> Result<(), BackendError>;
    /// Dump every route of `family` across all tables. No table filter.
    async fn list_routes(&mut self, family: AddressFamily)
    -> Result<Vec<RouteRecord>, BackendError>;
}

#[async_trait]
pub trait RouteTableFactory: Send + Sync {
    /// Human-readable backend name (e.g. "rtnetlink").
    fn name(&self) -> &str;
    /// Open a table bound to the calling thread's current namespace.
    ///
    /// Must be called after entering the target namespace: the binding is
    /// fixed at open time.
    async fn open(&self) -> Result<Box<dyn RouteTable>, BackendError>;
}
