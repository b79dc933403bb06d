//! Durable key/value storage for the session.
//!
//! The session lives under two keys: [`keys::TOKEN`] holds the bearer token
//! and [`keys::USER`] holds the JSON-encoded [`UserProfile`]. Both are
//! written and removed together; a half-present pair is treated as no
//! session and cleaned up on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use tillpoint_core::{Session, UserProfile};

/// Storage keys for the persisted session.
pub mod keys {
    /// Key for the bearer token.
    pub const TOKEN: &str = "token";
    /// Key for the serialized user profile.
    pub const USER: &str = "user";
}

/// Errors that can occur when reading or writing session storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem read/write failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A previous writer panicked while holding the storage lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key/value store that outlives the process, like browser
/// local storage.
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Storage that lives only as long as the process. Used in tests and when
/// no session file is configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File storage
// =============================================================================

/// Storage backed by a single JSON object file.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Use the file at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// Session helpers
// =============================================================================

/// Load the persisted session.
///
/// A token without a profile, a profile without a token, or an unreadable
/// profile all count as "no session"; the leftovers are removed.
///
/// # Errors
///
/// Returns `StorageError` if the store cannot be read or cleaned up.
pub fn load_session(storage: &dyn SessionStorage) -> Result<Option<Session>, StorageError> {
    let token = storage.get(keys::TOKEN)?;
    let user = storage.get(keys::USER)?;

    match (token, user) {
        (Some(token), Some(user)) => match serde_json::from_str::<UserProfile>(&user) {
            Ok(user) => Ok(Some(Session::new(token, user))),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored user profile");
                clear_session(storage)?;
                Ok(None)
            }
        },
        (None, None) => Ok(None),
        _ => {
            tracing::warn!("Discarding half-stored session");
            clear_session(storage)?;
            Ok(None)
        }
    }
}

/// Persist a session under both keys.
///
/// # Errors
///
/// Returns `StorageError` if the store cannot be written.
pub fn save_session(storage: &dyn SessionStorage, session: &Session) -> Result<(), StorageError> {
    let user = serde_json::to_string(&session.user)?;
    storage.set(keys::USER, &user)?;
    storage.set(keys::TOKEN, &session.token)?;
    Ok(())
}

/// Remove both session keys.
///
/// # Errors
///
/// Returns `StorageError` if the store cannot be written.
pub fn clear_session(storage: &dyn SessionStorage) -> Result<(), StorageError> {
    storage.remove(keys::TOKEN)?;
    storage.remove(keys::USER)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tillpoint_core::{Role, UserId};

    fn session() -> Session {
        Session::new(
            "tok-1".to_owned(),
            UserProfile {
                id: UserId::new(1),
                username: "boss".to_owned(),
                display_name: "The Boss".to_owned(),
                role: Role::Admin,
            },
        )
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(load_session(&storage).unwrap(), None);

        save_session(&storage, &session()).unwrap();
        assert_eq!(load_session(&storage).unwrap(), Some(session()));

        clear_session(&storage).unwrap();
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn test_half_stored_session_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "orphan").unwrap();

        assert_eq!(load_session(&storage).unwrap(), None);
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
    }

    #[test]
    fn test_corrupt_profile_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "tok").unwrap();
        storage.set(keys::USER, "{not json").unwrap();

        assert_eq!(load_session(&storage).unwrap(), None);
        assert_eq!(storage.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        save_session(&FileStorage::new(&path), &session()).unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(load_session(&reopened).unwrap(), Some(session()));

        clear_session(&reopened).unwrap();
        assert_eq!(load_session(&FileStorage::new(&path)).unwrap(), None);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        storage.remove(keys::TOKEN).unwrap();
        assert!(!storage.path().exists());
    }
}
