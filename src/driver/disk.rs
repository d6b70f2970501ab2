use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::Driver;

const SHARD_WIDTH: usize = 2;

/// Driver persisting each record as one file under a two-level shard
/// tree derived from the key prefix. Writes go to a temp file first and
/// are renamed into place so readers never observe a half-written
/// record.
///
/// I/O failures are reported through the `Driver` contract (`false` /
/// `None`) and logged; the store's read-back verification turns a lost
/// write into a hard error where it matters.
#[derive(Debug, Clone)]
pub struct DiskDriver {
    root: PathBuf,
}

impl DiskDriver {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        // Keys too short to shard land directly under the root.
        if key.len() < SHARD_WIDTH * 2
            || !key.is_char_boundary(SHARD_WIDTH)
            || !key.is_char_boundary(SHARD_WIDTH * 2)
        {
            return self.root.join(key);
        }
        let (first, remainder) = key.split_at(SHARD_WIDTH);
        let (second, _) = remainder.split_at(SHARD_WIDTH);
        self.root.join(first).join(second).join(key)
    }

    fn try_save(&self, key: &str, value: &[u8]) -> io::Result<()> {
        let final_path = self.record_path(key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.root.join(format!("tmp_{}", uuid::Uuid::new_v4()));
        fs::write(&temp_path, value)?;
        if let Err(err) = fs::rename(&temp_path, &final_path) {
            fs::remove_file(&temp_path).ok();
            return Err(err);
        }
        Ok(())
    }

    fn prune_empty_shards(&self, record_path: &Path) {
        let mut dir = record_path.parent();
        while let Some(path) = dir {
            if path == self.root || !dir_is_empty(path) {
                break;
            }
            fs::remove_dir(path).ok();
            dir = path.parent();
        }
    }
}

impl Driver for DiskDriver {
    fn save(&self, key: &str, value: &[u8]) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, key, "failed to persist cache record");
                false
            }
        }
    }

    fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.record_path(key)).ok()
    }

    fn contains(&self, key: &str) -> bool {
        self.record_path(key).is_file()
    }

    fn delete(&self, key: &str) -> bool {
        let path = self.record_path(key);
        if fs::remove_file(&path).is_ok() {
            self.prune_empty_shards(&path);
            true
        } else {
            false
        }
    }
}

fn dir_is_empty(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}
