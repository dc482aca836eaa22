use std::path::Path;

use crate::app::worker::WorkerSlot;

pub const PULL_LOCK_FILE: &str = ".pull.lock";
pub const KILL_LOCK_FILE: &str = ".kill.lock";

/// Long-running batches, one slot each, so a pull and a kill may overlap but two pulls may not.
pub struct AppState {
    pub pull_worker: WorkerSlot,
    pub kill_worker: WorkerSlot,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            pull_worker: WorkerSlot::new("pull"),
            kill_worker: WorkerSlot::new("kill"),
        }
    }

    /// Slots backed by lock files under `root`, so concurrent invocations sharing an output
    /// root also exclude each other.
    pub fn with_lock_dir(root: &Path) -> Self {
        Self {
            pull_worker: WorkerSlot::with_lock_file("pull", root.join(PULL_LOCK_FILE)),
            kill_worker: WorkerSlot::with_lock_file("kill", root.join(KILL_LOCK_FILE)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
