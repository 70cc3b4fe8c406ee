//! Run async work on one dedicated OS thread.
//!
//! Network namespace membership belongs to a thread. A multi-threaded
//! runtime may resume a task on any worker, so namespace-sensitive work runs
//! on a fresh thread driving a current-thread runtime. The thread exits when
//! the work completes and takes any namespace it entered with it.

use std::any::Any;
use std::future::Future;
use std::thread;

use tracing::debug;

use crate::error::PinnedError;

/// Spawn a thread named `name`, build a current-thread runtime on it, and
/// block on the future returned by `work`.
pub fn run_pinned<F, Fut, T>(name: &str, work: F) -> Result<T, PinnedError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || -> std::io::Result<T> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(runtime.block_on(work()))
        })
        .map_err(|source| PinnedError::Spawn {
            name: name.to_string(),
            source,
        })?;
    debug!(thread = name, "pinned thread started");

    match handle.join() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(PinnedError::Runtime {
            name: name.to_string(),
            source,
        }),
        Err(payload) => Err(PinnedError::Panicked {
            name: name.to_string(),
            message: panic_message(payload.as_ref()).to_string(),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown")
}
