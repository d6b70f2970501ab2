use std::collections::HashSet;

use parking_lot::Mutex;

/// Tracks which lock markers this store instance created, so `cleanup`
/// releases exactly its own locks and never a peer instance's.
#[derive(Debug, Default)]
pub(crate) struct LockRegistry {
    acquired: Mutex<HashSet<String>>,
}

impl LockRegistry {
    pub(crate) fn record(&self, key: String) {
        self.acquired.lock().insert(key);
    }

    pub(crate) fn forget(&self, key: &str) {
        self.acquired.lock().remove(key);
    }

    /// Empties the registry, handing back every recorded key.
    pub(crate) fn drain(&self) -> Vec<String> {
        self.acquired.lock().drain().collect()
    }
}
