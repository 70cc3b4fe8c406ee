use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::error::{ProbeError, Result};
use crate::table::RouteTable;
use crate::types::{AddressFamily, InterfaceRef, RouteRequest};

/// Host routes only.
pub const HOST_PREFIX_LEN: u8 = 32;

/// Family of every synthetic route, and so of the sanity check and the
/// measured enumeration.
pub const HOST_ROUTE_FAMILY: AddressFamily = AddressFamily::Inet;

const PROGRESS_INTERVAL: u32 = 1000;

/// Destination of the `index`-th synthetic route.
///
/// The counter is written as a little-endian `u32` and read back as the four
/// octets of the address:
///
/// | index   | destination   |
/// |---------|---------------|
/// | 0       | `0.0.0.0`     |
/// | 1       | `1.0.0.0`     |
/// | 255     | `255.0.0.0`   |
/// | 256     | `0.1.0.0`     |
/// | 15000   | `152.58.0.0`  |
///
/// The mapping is a bijection on `u32`, so any `count` yields distinct /32s.
pub fn host_route_destination(index: u32) -> Ipv4Addr {
    Ipv4Addr::from(index.to_le_bytes())
}

/// Insert `count` host routes via `iface`, one request at a time.
///
/// Stops at the first failure. Routes inserted before the failing index are
/// left in place.
pub async fn populate(
    table: &mut dyn RouteTable,
    iface: &InterfaceRef,
    count: u32,
    table_id: Option<u32>,
) -> Result<()> {
    info!(count, interface = %iface.name, "adding fake routes");
    for index in 0..count {
        let route = RouteRequest {
            destination: host_route_destination(index),
            prefix_len: HOST_PREFIX_LEN,
            oif: iface.index,
            table: table_id,
        };
        table
            .add_route(&route)
            .await
            .map_err(|source| ProbeError::RouteInsert { index, source })?;
        if (index + 1) % PROGRESS_INTERVAL == 0 {
            debug!(inserted = index + 1, count, "route insertion progress");
        }
    }
    info!(count, "routes added");
    Ok(())
}
