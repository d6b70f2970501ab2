use std::collections::HashMap;

use parking_lot::Mutex;

use super::Driver;

/// Process-local driver backed by a plain map. Suitable for tests and
/// for single-process deployments where the cache may die with the
/// process.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, metadata and entities alike.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Driver for MemoryDriver {
    fn save(&self, key: &str, value: &[u8]) -> bool {
        self.records.lock().insert(key.to_string(), value.to_vec());
        true
    }

    fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        self.records.lock().get(key).cloned()
    }

    fn contains(&self, key: &str) -> bool {
        self.records.lock().contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.records.lock().remove(key).is_some()
    }
}
