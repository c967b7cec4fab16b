/*
    spotify-discover | Rust CLI to explore your Spotify profile, library and recommendations.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const KEY_VERIFIER: &str = "verifier";
pub const KEY_STATE: &str = "state";
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_EXPIRATION_TIME: &str = "expiration_time";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Session store lock poisoned")]
    Poisoned,
}

/// Durable key-value storage for session state.
///
/// Only the session manager reads and writes through this trait.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Writes several entries together. Backends that can should apply them
    /// all or none; the default writes them one by one.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn set_all(&self, pairs: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
///
/// Every write replaces the whole file through a temporary file and a rename,
/// so readers never see a half-written file. The lock serializes writers
/// within this process; across processes the last write wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) if data.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the entries before a write. A corrupt file is discarded so that
    /// a new login can replace it; the flag asks the caller to rewrite it.
    fn read_for_update(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Corrupt(e)) => {
                warn!(
                    "Discarding corrupt session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let data = serde_json::to_string_pretty(entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;

        // The file holds a bearer token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let (mut entries, recovered) = self.read_for_update()?;
        if entries.remove(key).is_some() || recovered {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn set_all(&self, pairs: &[(&str, &str)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let (mut entries, _) = self.read_for_update()?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(KEY_STATE).unwrap().is_none());

        store.set(KEY_STATE, "abc123").unwrap();
        assert_eq!(store.get(KEY_STATE).unwrap().as_deref(), Some("abc123"));

        store.set(KEY_STATE, "def456").unwrap();
        assert_eq!(store.get(KEY_STATE).unwrap().as_deref(), Some("def456"));

        store.remove(KEY_STATE).unwrap();
        assert!(store.get(KEY_STATE).unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        assert!(store.get(KEY_ACCESS_TOKEN).unwrap().is_none());
        store.remove(KEY_ACCESS_TOKEN).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        store.set(KEY_ACCESS_TOKEN, "token").unwrap();
        store.set(KEY_EXPIRATION_TIME, "1700000000000").unwrap();
        store.set(KEY_VERIFIER, "v").unwrap();
        store.remove(KEY_VERIFIER).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(KEY_ACCESS_TOKEN).unwrap().as_deref(), Some("token"));
        assert_eq!(
            reopened.get(KEY_EXPIRATION_TIME).unwrap().as_deref(),
            Some("1700000000000")
        );
        assert!(reopened.get(KEY_VERIFIER).unwrap().is_none());
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get(KEY_STATE), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_file_store_writes_over_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"access_token": "tok"#).unwrap();

        let store = FileStore::new(&path);
        store.set(KEY_STATE, "abc123").unwrap();

        assert_eq!(store.get(KEY_STATE).unwrap().as_deref(), Some("abc123"));
        assert!(store.get(KEY_ACCESS_TOKEN).unwrap().is_none());
    }

    #[test]
    fn test_file_store_remove_rewrites_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        store.remove(KEY_VERIFIER).unwrap();

        assert!(store.get(KEY_VERIFIER).unwrap().is_none());
    }

    #[test]
    fn test_file_store_set_all_leaves_only_the_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store
            .set_all(&[(KEY_EXPIRATION_TIME, "1700000000000"), (KEY_ACCESS_TOKEN, "token")])
            .unwrap();

        assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap().as_deref(), Some("token"));
        assert_eq!(
            store.get(KEY_EXPIRATION_TIME).unwrap().as_deref(),
            Some("1700000000000")
        );
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_memory_store_set_all() {
        let store = MemoryStore::new();
        store
            .set_all(&[(KEY_EXPIRATION_TIME, "1"), (KEY_ACCESS_TOKEN, "token")])
            .unwrap();
        assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap().as_deref(), Some("token"));
        assert_eq!(store.get(KEY_EXPIRATION_TIME).unwrap().as_deref(), Some("1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set(KEY_ACCESS_TOKEN, "token").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
