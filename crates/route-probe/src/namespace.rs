use crate::error::BackendError;
use crate::types::NamespaceId;

/// An open reference to a network namespace.
///
/// Dropping the handle releases it. Implementations release exactly once, so
/// scoped ownership covers every exit path.
pub trait NamespaceHandle {
    fn id(&self) -> NamespaceId;
}

/// Switches the *calling thread* between network namespaces.
///
/// Namespace membership is per OS thread. Callers must stay on one thread
/// from `capture_current` until the matching `restore` returns.
pub trait NamespaceControl {
    type Handle: NamespaceHandle;

    /// Handle to the namespace the calling thread is in now.
    fn capture_current(&self) -> Result<Self::Handle, BackendError>;
    /// Create a new, empty namespace and move the calling thread into it.
    fn create_isolated(&self) -> Result<Self::Handle, BackendError>;
    /// Move the calling thread into `handle`'s namespace.
    fn restore(&self, handle: &Self::Handle) -> Result<(), BackendError>;
    /// Identity of the calling thread's current namespace, without keeping a handle.
    fn current_identity(&self) -> Result<NamespaceId, BackendError>;
}
