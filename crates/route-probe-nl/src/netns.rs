use std::fs::File;
use std::os::unix::fs::MetadataExt;

use nix::sched::{CloneFlags, setns, unshare};
use route_probe::{BackendError, NamespaceControl, NamespaceHandle, NamespaceId};
use tracing::debug;

/// Network namespace of the calling thread (not the process).
pub const THREAD_NETNS_PATH: &str = "/proc/thread-self/ns/net";

/// An open nsfs descriptor. Closed on drop.
#[derive(Debug)]
pub struct NetnsHandle {
    file: File,
    id: NamespaceId,
}

impl NetnsHandle {
    fn open_current() -> Result<Self, BackendError> {
        let file = File::open(THREAD_NETNS_PATH)
            .map_err(|e| BackendError::new(format!("open {THREAD_NETNS_PATH}"), e))?;
        let id = identity(&file)?;
        Ok(Self { file, id })
    }
}

impl NamespaceHandle for NetnsHandle {
    fn id(&self) -> NamespaceId {
        self.id
    }
}

fn identity(file: &File) -> Result<NamespaceId, BackendError> {
    let meta = file
        .metadata()
        .map_err(|e| BackendError::new("stat netns", e))?;
    Ok(NamespaceId {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

/// Namespace switching via `unshare(2)` / `setns(2)` on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxNamespaces;

impl NamespaceControl for LinuxNamespaces {
    type Handle = NetnsHandle;

    fn capture_current(&self) -> Result<NetnsHandle, BackendError> {
        let handle = NetnsHandle::open_current()?;
        debug!(netns = %handle.id, "captured netns");
        Ok(handle)
    }

    fn create_isolated(&self) -> Result<NetnsHandle, BackendError> {
        unshare(CloneFlags::CLONE_NEWNET)
            .map_err(|e| BackendError::new("unshare(CLONE_NEWNET)", e))?;
        let handle = NetnsHandle::open_current()?;
        debug!(netns = %handle.id, "created netns");
        Ok(handle)
    }

    fn restore(&self, handle: &NetnsHandle) -> Result<(), BackendError> {
        setns(&handle.file, CloneFlags::CLONE_NEWNET)
            .map_err(|e| BackendError::new(format!("setns({})", handle.id), e))
    }

    fn current_identity(&self) -> Result<NamespaceId, BackendError> {
        let file = File::open(THREAD_NETNS_PATH)
            .map_err(|e| BackendError::new(format!("open {THREAD_NETNS_PATH}"), e))?;
        identity(&file)
    }
}
