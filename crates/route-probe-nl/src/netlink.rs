//! Route table access over rtnetlink.
//!
//! Each [`NetlinkTable`] owns one `NETLINK_ROUTE` socket. The socket joins the
//! namespace of the thread that creates it and stays there, so tables must be
//! opened from inside the namespace they should operate on.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::pin::pin;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use netlink_packet_route::AddressFamily as NlFamily;
use netlink_packet_route::route::{RouteAddress, RouteAttribute, RouteMessage, RouteProtocol};
use route_probe::{
    AddressFamily, BackendError, InterfaceRef, RouteOrigin, RouteRecord, RouteRequest, RouteTable,
    RouteTableFactory,
};
use rtnetlink::{Handle, IpVersion};
use tokio::task::JoinHandle;
use tracing::debug;

/// Opens rtnetlink-backed tables in the calling thread's namespace.
///
/// Must be used from within a tokio runtime: the socket's connection task is
/// spawned onto it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetlinkTables;

#[async_trait]
impl RouteTableFactory for NetlinkTables {
    fn name(&self) -> &str {
        "rtnetlink"
    }

    async fn open(&self) -> Result<Box<dyn RouteTable>, BackendError> {
        let (connection, handle, _) = rtnetlink::new_connection()
            .map_err(|e| BackendError::new("open netlink socket", e))?;
        let connection = tokio::spawn(connection);
        debug!("netlink route socket opened");
        Ok(Box::new(NetlinkTable { handle, connection }))
    }
}

pub struct NetlinkTable {
    handle: Handle,
    /// Background task driving the socket.
    connection: JoinHandle<()>,
}

impl Drop for NetlinkTable {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl RouteTable for NetlinkTable {
    async fn interface_by_name(&mut self, name: &str) -> Result<InterfaceRef, BackendError> {
        let mut links = pin!(
            self.handle
                .link()
                .get()
                .match_name(name.to_string())
                .execute()
        );
        match links.try_next().await {
            Ok(Some(msg)) => Ok(InterfaceRef {
                name: name.to_string(),
                index: msg.header.index,
            }),
            Ok(None) => Err(BackendError::new(
                format!("get link {name}"),
                "no such device",
            )),
            Err(e) => Err(BackendError::new(format!("get link {name}"), e)),
        }
    }

    async fn set_interface_up(&mut self, iface: &InterfaceRef) -> Result<(), BackendError> {
        self.handle
            .link()
            .set(iface.index)
            .up()
            .execute()
            .await
            .map_err(|e| BackendError::new(format!("set link {} up", iface.name), e))
    }

    async fn add_route(&mut self, route: &RouteRequest) -> Result<(), BackendError> {
        let mut request = self
            .handle
            .route()
            .add()
            .v4()
            .destination_prefix(route.destination, route.prefix_len)
            .output_interface(route.oif);
        if let Some(table) = route.table {
            request = request.table_id(table);
        }
        request.execute().await.map_err(|e| {
            BackendError::new(
                format!("add route {}/{}", route.destination, route.prefix_len),
                e,
            )
        })
    }

    async fn list_routes(
        &mut self,
        family: AddressFamily,
    ) -> Result<Vec<RouteRecord>, BackendError> {
        let version = match family {
            AddressFamily::Inet => IpVersion::V4,
            AddressFamily::Inet6 => IpVersion::V6,
        };
        // A plain dump carries no RTA_TABLE, so the kernel walks every table.
        self.handle
            .route()
            .get(version)
            .execute()
            .map_ok(|msg| route_record(&msg))
            .try_collect()
            .await
            .map_err(|e| BackendError::new(format!("dump {family} routes"), e))
    }
}

/// Decode one dump entry.
///
/// A missing `RTA_DST` means the unspecified address (default route), a
/// missing `RTA_OIF` becomes index 0, and `RTA_TABLE` wins over the 8-bit
/// header field when present.
fn route_record(msg: &RouteMessage) -> RouteRecord {
    let mut destination = None;
    let mut oif = 0;
    let mut table = u32::from(msg.header.table);
    for attr in &msg.attributes {
        match attr {
            RouteAttribute::Destination(RouteAddress::Inet(addr)) => {
                destination = Some(IpAddr::V4(*addr));
            }
            RouteAttribute::Destination(RouteAddress::Inet6(addr)) => {
                destination = Some(IpAddr::V6(*addr));
            }
            RouteAttribute::Oif(index) => oif = *index,
            RouteAttribute::Table(id) => table = *id,
            _ => {}
        }
    }
    let destination = destination.unwrap_or(match msg.header.address_family {
        NlFamily::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    });
    let origin = if msg.header.protocol == RouteProtocol::Kernel {
        RouteOrigin::Kernel
    } else {
        RouteOrigin::Installed
    };
    RouteRecord {
        destination,
        prefix_len: msg.header.destination_prefix_length,
        oif,
        table,
        origin,
    }
}
