use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::{Result, StorageBackend, StorageError};

/// Storage persisted as a single JSON object on disk.
///
/// The file is read on every access and rewritten in full on every
/// `set`/`remove`, so two processes pointed at the same path see each
/// other's writes, with last write wins semantics.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the target, so a crash mid-write leaves the previous contents intact.
/// A file that does not parse is an error for `get`, but `set` and `remove`
/// replace it.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Like `load`, but an unparseable file reads as empty. The flag is set
    /// when that happened, so the caller rewrites the file.
    fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.load() {
            Ok(entries) => Ok((entries, false)),
            Err(StorageError::Serialization(err)) => {
                warn!(
                    "Discarding unreadable storage file {}: {}",
                    self.path.display(),
                    err
                );
                Ok((BTreeMap::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };
        let raw = serde_json::to_string_pretty(entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(raw.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        debug!("Wrote {} storage entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, _) = self.load_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, reset) = self.load_for_write()?;
        if entries.remove(key).is_some() || reset {
            self.store(&entries)?;
        }
        Ok(())
    }
}
