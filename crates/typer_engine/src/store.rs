use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::persist::{AtomicFileWriter, PersistError};

/// Atomic key -> bytes storage underneath the session codec.
pub trait RecordStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
    /// Replace the whole value for `key`; readers never observe a partial write.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError>;
    /// Returns whether something was removed.
    fn remove(&self, key: &str) -> Result<bool, PersistError>;
}

/// One file per key inside a directory, written via temp-file-then-rename.
pub struct FileRecordStore {
    writer: AtomicFileWriter,
}

impl FileRecordStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.writer.dir().join(key)
    }
}

impl RecordStore for FileRecordStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        self.writer.read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        self.writer.write(key, bytes).map(|_| ())
    }

    fn remove(&self, key: &str) -> Result<bool, PersistError> {
        self.writer.remove(key)
    }
}

/// In-memory store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.lock().insert(key.to_string(), bytes);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map still holds whole values; keep using it.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.lock().remove(key).is_some())
    }
}
