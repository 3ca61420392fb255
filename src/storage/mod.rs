//! Local persistence for conversations, checklists, and preferences.
//!
//! All client-side state is stored as string-keyed values behind the
//! [`Repository`] trait, so the conversation store and checklist state can
//! be tested against an in-memory implementation without touching disk.
//! Production uses an embedded `sled` database in the user's data
//! directory.
//!
//! Logical keys follow a small, flat contract:
//!
//! - `user_id` - stable per-installation user identifier
//! - `conversations` - ordered conversation list (JSON)
//! - `messages_{conversationId}` - ordered message list (JSON)
//! - `shopping_{messageId}` - checked checklist indices (JSON)
//! - `theme` - UI theme preference

use crate::error::{Result, KondateError};
use anyhow::Context;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key under which the stable user identifier is stored.
pub const KEY_USER_ID: &str = "user_id";

/// Key under which the conversation list is stored.
pub const KEY_CONVERSATIONS: &str = "conversations";

/// Key under which the UI theme preference is stored.
pub const KEY_THEME: &str = "theme";

/// Storage key for a conversation's message list.
pub fn messages_key(conversation_id: &str) -> String {
    format!("messages_{}", conversation_id)
}

/// Storage key for a message's checklist check-state.
pub fn checklist_key(message_id: &str) -> String {
    format!("shopping_{}", message_id)
}

/// Key/value persistence used by the chat client
///
/// Implementations must behave like a flat string-keyed map: `get` of an
/// absent key returns `None`, `set` overwrites, `delete` of an absent key
/// is a no-op.
pub trait Repository: Send + Sync {
    /// Read the raw value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`
    fn delete(&self, key: &str) -> Result<()>;
}

/// JSON helpers layered over the raw string contract.
impl dyn Repository {
    /// Read and deserialize the JSON value stored under `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| KondateError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` to JSON and store it under `key`
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| KondateError::Storage(format!("Serialization failed: {}", e)))?;
        self.set(key, &raw)
    }
}

/// Repository backed by an embedded `sled` database
pub struct SledRepository {
    db: Db,
}

impl SledRepository {
    /// Open or create the repository in the default data directory.
    ///
    /// The location can be overridden with the `KONDATE_DATA_DIR`
    /// environment variable, which makes it easy to point the binary at a
    /// test database without changing the user's application data dir.
    pub fn open_default() -> Result<Self> {
        if let Ok(override_dir) = std::env::var("KONDATE_DATA_DIR") {
            return Self::open(PathBuf::from(override_dir).join("kondate.db"));
        }

        let proj_dirs = ProjectDirs::from("app", "kondate", "kondate")
            .ok_or_else(|| KondateError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| KondateError::Storage(e.to_string()))?;

        Self::open(data_dir.join("kondate.db"))
    }

    /// Open or create a repository at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `KondateError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kondate::storage::SledRepository;
    ///
    /// # fn main() -> kondate::error::Result<()> {
    /// let repo = SledRepository::open("/tmp/kondate.db")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| KondateError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }
}

impl Repository for SledRepository {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| KondateError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|e| KondateError::Storage(format!("Invalid UTF-8 value: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| KondateError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| KondateError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| KondateError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| KondateError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

/// In-memory repository for tests
#[derive(Default)]
pub struct MemoryRepository {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryRepository {
    /// Create an empty in-memory repository
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryRepository {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| KondateError::Storage("Repository lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| KondateError::Storage("Repository lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| KondateError::Storage("Repository lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}
