//! Persistent session storage
//!
//! Values are plain strings under fixed keys, the way a browser keeps them
//! in local storage, so a restart can restore the session without a
//! network round trip for the tokens.

use base64::Engine;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeskError, Result};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const CURRENT_USER_KEY: &str = "current_user";

/// Key/value store backing the session
pub trait SessionStorage: Send + Sync + Debug {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Storage that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage, as left behind by an earlier run
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let items = items
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// File storage configuration
#[derive(Debug, Clone, Default)]
pub struct FileStorageConfig {
    pub storage_path: Option<PathBuf>,
    pub encryption_key: Option<String>,
}

/// JSON-object file, rewritten on every mutation
#[derive(Debug)]
pub struct FileStorage {
    config: FileStorageConfig,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        let store = Self {
            config,
            items: Mutex::new(BTreeMap::new()),
        };

        match store.load_items() {
            Ok(items) => *store.items.lock() = items,
            Err(e) => {
                tracing::warn!("Discarding unreadable session storage: {}", e);
            }
        }

        Ok(store)
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.config.storage_path.as_deref()
    }

    fn get_storage_path(&self) -> Result<PathBuf> {
        self.config
            .storage_path
            .clone()
            .ok_or_else(|| DeskError::invalid_input("Session storage path not configured"))
    }

    fn load_items(&self) -> Result<BTreeMap<String, String>> {
        let path = self.get_storage_path()?;

        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DeskError::io_from_error("Failed to read session storage", e))?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let decrypted_content = match &self.config.encryption_key {
            Some(key) => decrypt_content(&content, key)?,
            None => content,
        };

        serde_json::from_str(&decrypted_content).map_err(|e| {
            DeskError::serialization(format!("Failed to parse session storage: {}", e))
        })
    }

    fn save_items(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let path = self.get_storage_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DeskError::io_from_error("Failed to create storage directory", e))?;
        }

        let content = serde_json::to_string_pretty(items)?;

        let final_content = match &self.config.encryption_key {
            Some(key) => encrypt_content(&content, key),
            None => content,
        };

        fs::write(&path, final_content)
            .map_err(|e| DeskError::io_from_error("Failed to write session storage", e))?;

        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    // Mutations are staged on a copy and only committed once the file is written
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();
        let mut staged = items.clone();
        staged.insert(key.to_string(), value.to_string());
        self.save_items(&staged)?;
        *items = staged;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock();
        if !items.contains_key(key) {
            return Ok(());
        }
        let mut staged = items.clone();
        staged.remove(key);
        self.save_items(&staged)?;
        *items = staged;
        Ok(())
    }
}

fn encrypt_content(content: &str, key: &str) -> String {
    let key_bytes = key.as_bytes();
    if key_bytes.is_empty() {
        return base64::engine::general_purpose::STANDARD.encode(content);
    }

    let encrypted: Vec<u8> = content
        .as_bytes()
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    base64::engine::general_purpose::STANDARD.encode(encrypted)
}

fn decrypt_content(encrypted_content: &str, key: &str) -> Result<String> {
    let encrypted_bytes = base64::engine::general_purpose::STANDARD
        .decode(encrypted_content.trim())
        .map_err(|e| DeskError::serialization(format!("Failed to decode session storage: {}", e)))?;

    let key_bytes = key.as_bytes();
    let decrypted: Vec<u8> = if key_bytes.is_empty() {
        encrypted_bytes
    } else {
        encrypted_bytes
            .iter()
            .enumerate()
            .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
            .collect()
    };

    String::from_utf8(decrypted)
        .map_err(|e| DeskError::serialization(format!("Failed to decode session storage: {}", e)))
}
