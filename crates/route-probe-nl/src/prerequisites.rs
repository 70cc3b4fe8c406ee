use std::path::Path;

use nix::unistd::geteuid;

use crate::error::BackendUnavailable;
use crate::netns::THREAD_NETNS_PATH;

/// Verify that this host can run a probe before touching any namespace.
///
/// Checks per-thread namespace files and the privilege needed for
/// `unshare(CLONE_NEWNET)` and `setns(2)`. Collects all failures and returns
/// them in a single error.
pub fn check_prerequisites() -> Result<(), BackendUnavailable> {
    let mut errors = Vec::new();

    check_file_exists(Path::new(THREAD_NETNS_PATH), "thread netns file", &mut errors);
    check_root(&mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BackendUnavailable(errors.join("; ")))
    }
}

fn check_file_exists(path: &Path, label: &str, errors: &mut Vec<String>) {
    if !path.exists() {
        errors.push(format!("{label} not found: {}", path.display()));
    }
}

fn check_root(errors: &mut Vec<String>) {
    if !geteuid().is_root() {
        errors.push(
            "root access required to create network namespaces; \
             please run with sudo"
                .to_string(),
        );
    }
}
