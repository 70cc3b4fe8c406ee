use crate::error::{ProbeError, Result};
use crate::table::RouteTable;
use crate::types::{AddressFamily, RouteOrigin, RouteRecord};

/// Dump every `family` route across all tables.
///
/// This is the call under measurement, so it does nothing beyond the dump.
pub async fn list_routes(
    table: &mut dyn RouteTable,
    family: AddressFamily,
) -> Result<Vec<RouteRecord>> {
    table.list_routes(family).await.map_err(ProbeError::RouteList)
}

/// Number of routes not installed by the kernel on its own.
pub fn count_installed(routes: &[RouteRecord]) -> usize {
    routes
        .iter()
        .filter(|r| r.origin != RouteOrigin::Kernel)
        .count()
}
