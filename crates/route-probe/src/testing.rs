//! In-memory stand-ins for the namespace, routing, and memory primitives.
//!
//! `FakeKernel` models per-namespace state the way the kernel exposes it to
//! one thread: a table opened via the factory stays bound to the namespace
//! that was current at open time, and bringing `lo` up installs the usual
//! kernel-origin local routes.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use async_trait::async_trait;

use crate::error::BackendError;
use crate::memory::MemoryProbe;
use crate::namespace::{NamespaceControl, NamespaceHandle};
use crate::table::{RouteTable, RouteTableFactory};
use crate::types::{
    AddressFamily, InterfaceRef, MemorySnapshot, NamespaceId, RouteOrigin, RouteRecord,
    RouteRequest,
};

const LOCAL_TABLE: u32 = 255;
const MAIN_TABLE: u32 = 254;
const LO_INDEX: u32 = 1;

/// Injected failures.
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub capture: bool,
    pub create: bool,
    pub restore: bool,
    pub open: bool,
    pub list: bool,
    pub link_up: bool,
    /// Fail the n-th `add_route` call (0-based) in any namespace.
    pub insert_at: Option<u32>,
    /// Seed every new namespace with one stray route.
    pub dirty_namespaces: bool,
    /// Suspend once inside `open`, so the caller can move the run elsewhere.
    pub yield_on_open: bool,
}

/// Kernel-visible operations, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Insert,
    List,
    /// A heap reading, with the installed-route count of the current
    /// namespace at that moment.
    Snapshot { installed: usize },
    Restore,
}

#[derive(Debug)]
struct Link {
    name: String,
    index: u32,
    up: bool,
}

#[derive(Debug)]
struct Netns {
    links: Vec<Link>,
    routes: Vec<RouteRecord>,
    /// (table, destination, prefix length) of every installed route.
    keys: HashSet<(u32, IpAddr, u8)>,
}

impl Netns {
    fn fresh() -> Self {
        Self {
            links: vec![Link {
                name: "lo".to_string(),
                index: LO_INDEX,
                up: false,
            }],
            routes: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

#[derive(Debug)]
struct KernelState {
    namespaces: Vec<Netns>,
    current: usize,
    open_handles: usize,
    add_calls: u32,
    calls: Vec<Call>,
    faults: Faults,
}

#[derive(Debug, Clone)]
pub struct FakeKernel {
    state: Arc<Mutex<KernelState>>,
}

impl FakeKernel {
    pub fn new(faults: Faults) -> Self {
        // Namespace 0 is the host namespace the test thread starts in.
        let host = Netns {
            links: vec![Link {
                name: "lo".to_string(),
                index: LO_INDEX,
                up: true,
            }],
            routes: vec![kernel_route(Ipv4Addr::new(127, 0, 0, 1), 32)],
            keys: HashSet::new(),
        };
        Self {
            state: Arc::new(Mutex::new(KernelState {
                namespaces: vec![host],
                current: 0,
                open_handles: 0,
                add_calls: 0,
                calls: Vec::new(),
                faults,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap()
    }

    pub fn current_namespace(&self) -> usize {
        self.lock().current
    }

    pub fn namespace_count(&self) -> usize {
        self.lock().namespaces.len()
    }

    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// A memory probe that logs each reading into this kernel's call log.
    pub fn memory(&self, readings: &[u64]) -> FakeMemory {
        FakeMemory {
            readings: Mutex::new(readings.iter().copied().collect()),
            kernel: Some(self.clone()),
        }
    }

    /// Routes in namespace `ns` that were not installed by the kernel.
    pub fn installed_routes(&self, ns: usize) -> Vec<RouteRecord> {
        self.lock().namespaces[ns]
            .routes
            .iter()
            .filter(|r| r.origin == RouteOrigin::Installed)
            .cloned()
            .collect()
    }

    pub fn tables(&self) -> FakeTables {
        FakeTables {
            kernel: self.clone(),
        }
    }

    /// A table bound to the current namespace, for engine tests.
    pub fn table(&self) -> FakeTable {
        FakeTable {
            kernel: self.clone(),
            ns: self.current_namespace(),
        }
    }
}

fn kernel_route(dst: Ipv4Addr, prefix_len: u8) -> RouteRecord {
    RouteRecord {
        destination: IpAddr::V4(dst),
        prefix_len,
        oif: LO_INDEX,
        table: LOCAL_TABLE,
        origin: RouteOrigin::Kernel,
    }
}

fn ns_id(index: usize) -> NamespaceId {
    NamespaceId {
        dev: 4,
        ino: 4026531840 + index as u64,
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    ns: usize,
    kernel: FakeKernel,
}

impl FakeHandle {
    fn open(kernel: &FakeKernel, ns: usize) -> Self {
        kernel.lock().open_handles += 1;
        Self {
            ns,
            kernel: kernel.clone(),
        }
    }
}

impl NamespaceHandle for FakeHandle {
    fn id(&self) -> NamespaceId {
        ns_id(self.ns)
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.kernel.lock().open_handles -= 1;
    }
}

impl NamespaceControl for FakeKernel {
    type Handle = FakeHandle;

    fn capture_current(&self) -> Result<FakeHandle, BackendError> {
        let current = {
            let state = self.lock();
            if state.faults.capture {
                return Err(BackendError::new("open netns", "permission denied"));
            }
            state.current
        };
        Ok(FakeHandle::open(self, current))
    }

    fn create_isolated(&self) -> Result<FakeHandle, BackendError> {
        let created = {
            let mut state = self.lock();
            if state.faults.create {
                return Err(BackendError::new("unshare", "EPERM: Operation not permitted"));
            }
            let mut ns = Netns::fresh();
            if state.faults.dirty_namespaces {
                ns.routes.push(kernel_route(Ipv4Addr::new(10, 0, 0, 1), 32));
            }
            state.namespaces.push(ns);
            state.current = state.namespaces.len() - 1;
            state.current
        };
        Ok(FakeHandle::open(self, created))
    }

    fn restore(&self, handle: &FakeHandle) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.faults.restore {
            return Err(BackendError::new("setns", "EINVAL: Invalid argument"));
        }
        state.current = handle.ns;
        state.calls.push(Call::Restore);
        Ok(())
    }

    fn current_identity(&self) -> Result<NamespaceId, BackendError> {
        Ok(ns_id(self.lock().current))
    }
}

pub struct FakeTables {
    kernel: FakeKernel,
}

#[async_trait]
impl RouteTableFactory for FakeTables {
    fn name(&self) -> &str {
        "fake"
    }

    async fn open(&self) -> Result<Box<dyn RouteTable>, BackendError> {
        let (fail, yield_first) = {
            let state = self.kernel.lock();
            (state.faults.open, state.faults.yield_on_open)
        };
        if yield_first {
            YieldOnce(false).await;
        }
        if fail {
            return Err(BackendError::new("netlink socket", "EMFILE"));
        }
        Ok(Box::new(self.kernel.table()))
    }
}

pub struct FakeTable {
    kernel: FakeKernel,
    ns: usize,
}

#[async_trait]
impl RouteTable for FakeTable {
    async fn interface_by_name(&mut self, name: &str) -> Result<InterfaceRef, BackendError> {
        let state = self.kernel.lock();
        state.namespaces[self.ns]
            .links
            .iter()
            .find(|l| l.name == name)
            .map(|l| InterfaceRef {
                name: l.name.clone(),
                index: l.index,
            })
            .ok_or_else(|| BackendError::new("get link", format!("no such device: {name}")))
    }

    async fn set_interface_up(&mut self, iface: &InterfaceRef) -> Result<(), BackendError> {
        let mut state = self.kernel.lock();
        if state.faults.link_up {
            return Err(BackendError::new("set link", "EPERM"));
        }
        let ns = &mut state.namespaces[self.ns];
        let link = ns
            .links
            .iter_mut()
            .find(|l| l.index == iface.index)
            .ok_or_else(|| BackendError::new("set link", "ENODEV"))?;
        if !link.up && link.name == "lo" {
            ns.routes.push(kernel_route(Ipv4Addr::new(127, 0, 0, 0), 8));
            ns.routes.push(kernel_route(Ipv4Addr::new(127, 0, 0, 1), 32));
            ns.routes
                .push(kernel_route(Ipv4Addr::new(127, 255, 255, 255), 32));
        }
        link.up = true;
        Ok(())
    }

    async fn add_route(&mut self, route: &RouteRequest) -> Result<(), BackendError> {
        let mut state = self.kernel.lock();
        let call = state.add_calls;
        state.add_calls += 1;
        if state.faults.insert_at == Some(call) {
            return Err(BackendError::new("add route", "ENOSPC: No space left on device"));
        }
        let ns = &mut state.namespaces[self.ns];
        let up = ns.links.iter().any(|l| l.index == route.oif && l.up);
        if !up {
            return Err(BackendError::new("add route", "ENETDOWN: Network is down"));
        }
        let table = route.table.unwrap_or(MAIN_TABLE);
        let destination = IpAddr::V4(route.destination);
        if !ns.keys.insert((table, destination, route.prefix_len)) {
            return Err(BackendError::new("add route", "EEXIST: File exists"));
        }
        ns.routes.push(RouteRecord {
            destination,
            prefix_len: route.prefix_len,
            oif: route.oif,
            table,
            origin: RouteOrigin::Installed,
        });
        state.calls.push(Call::Insert);
        Ok(())
    }

    async fn list_routes(
        &mut self,
        family: AddressFamily,
    ) -> Result<Vec<RouteRecord>, BackendError> {
        let mut state = self.kernel.lock();
        if state.faults.list {
            return Err(BackendError::new("dump routes", "ENOBUFS"));
        }
        state.calls.push(Call::List);
        Ok(state.namespaces[self.ns]
            .routes
            .iter()
            .filter(|r| match family {
                AddressFamily::Inet => r.destination.is_ipv4(),
                AddressFamily::Inet6 => r.destination.is_ipv6(),
            })
            .cloned()
            .collect())
    }
}

/// Pending on the first poll, ready on the second.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Replays a fixed sequence of heap readings.
pub struct FakeMemory {
    readings: Mutex<VecDeque<u64>>,
    kernel: Option<FakeKernel>,
}

impl FakeMemory {
    pub fn new(readings: &[u64]) -> Self {
        Self {
            readings: Mutex::new(readings.iter().copied().collect()),
            kernel: None,
        }
    }
}

impl MemoryProbe for FakeMemory {
    fn snapshot(&self) -> Result<MemorySnapshot, BackendError> {
        let snapshot = self
            .readings
            .lock()
            .unwrap()
            .pop_front()
            .map(|heap_bytes| MemorySnapshot { heap_bytes })
            .ok_or_else(|| BackendError::new("read stats", "no reading available"))?;
        if let Some(kernel) = &self.kernel {
            let mut state = kernel.lock();
            let current = state.current;
            let installed = state.namespaces[current]
                .routes
                .iter()
                .filter(|r| r.origin == RouteOrigin::Installed)
                .count();
            state.calls.push(Call::Snapshot { installed });
        }
        Ok(snapshot)
    }
}
