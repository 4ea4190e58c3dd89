//! Model weight resolution with best → init fallback.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Prefer the trained "best" weights for a plan; fall back to the "init"
/// weights distributed with the installation. `None` when neither exists.
pub fn resolve_pbuf(weights_dir: &Path, plan: &str) -> Option<PathBuf> {
    let best = weights_dir.join(format!("{plan}_best.pbuf"));
    if best.is_file() {
        return Some(best);
    }

    let init = weights_dir.join(format!("{plan}_init.pbuf"));
    if init.is_file() {
        debug!(plan = plan, "Best weights absent, falling back to init weights");
        return Some(init);
    }

    None
}
