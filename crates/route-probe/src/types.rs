use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::Serialize;

const MIB: i64 = 1 << 20;

/// Address family selector for route enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inet => f.write_str("inet"),
            Self::Inet6 => f.write_str("inet6"),
        }
    }
}

/// Identity of a network namespace: the device and inode of its nsfs entry.
///
/// Two handles refer to the same namespace iff their identities are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId {
    pub dev: u64,
    pub ino: u64,
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same notation as the /proc/<pid>/ns/net symlink target.
        write!(f, "net:[{}]", self.ino)
    }
}

/// A resolved interface inside the namespace the route table is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRef {
    pub name: String,
    pub index: u32,
}

/// Who installed a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrigin {
    /// Installed by the kernel itself (e.g. local table entries for `lo`).
    Kernel,
    /// Installed by a user-space request.
    Installed,
}

/// One route as reported by an enumeration dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub destination: IpAddr,
    pub prefix_len: u8,
    /// Egress interface index, 0 when the route has none.
    pub oif: u32,
    pub table: u32,
    pub origin: RouteOrigin,
}

/// A host route to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub destination: Ipv4Addr,
    pub prefix_len: u8,
    pub oif: u32,
    /// Target table; `None` leaves the choice to the kernel (main).
    pub table: Option<u32>,
}

/// Process-wide heap statistics at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub heap_bytes: u64,
}

impl MemorySnapshot {
    /// Signed difference `after - before`, saturating at the `i64` bounds.
    pub fn delta(before: Self, after: Self) -> MemoryDelta {
        let diff = i128::from(after.heap_bytes) - i128::from(before.heap_bytes);
        let bytes = i64::try_from(diff).unwrap_or(if diff.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        MemoryDelta(bytes)
    }
}

/// Heap growth across the measured call, in bytes. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MemoryDelta(pub i64);

impl MemoryDelta {
    pub fn bytes(self) -> i64 {
        self.0
    }

    /// Whole mebibytes, truncated toward zero.
    pub fn mebibytes(self) -> i64 {
        self.0 / MIB
    }
}

impl fmt::Display for MemoryDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M", self.mebibytes())
    }
}
