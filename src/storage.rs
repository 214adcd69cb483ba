use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{AuthUser, List, Task, ThemeMode};

const STORAGE_FILE: &str = "storage.json";

pub const KEY_TASKS: &str = "tasks";
pub const KEY_LISTS: &str = "lists";
pub const KEY_USER: &str = "user";
pub const KEY_IS_AUTHENTICATED: &str = "isAuthenticated";
pub const KEY_IS_GRID_VIEW: &str = "isGridView";
pub const KEY_THEME: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Textual key-value persistence, the same contract as browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock_entries(entries: &Mutex<BTreeMap<String, String>>) -> MutexGuard<'_, BTreeMap<String, String>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps every key in one JSON object on disk. Each write rewrites the whole file.
pub struct FileStore {
    root: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root)?;
        let path = root.join(STORAGE_FILE);
        let entries = if path.exists() {
            match load_json::<BTreeMap<String, String>>(&path) {
                Ok(entries) => entries,
                Err(StorageError::Json(err)) => {
                    log::warn!(
                        "storage file is not valid json, starting empty path={} err={err}",
                        path.display()
                    );
                    BTreeMap::new()
                }
                Err(err) => return Err(err),
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            root,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        write_atomic(&self.root.join(STORAGE_FILE), entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock_entries(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = lock_entries(&self.entries);
        guard.insert(key.to_string(), value.to_string());
        self.flush(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = lock_entries(&self.entries);
        if guard.remove(key).is_some() {
            self.flush(&guard)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock_entries(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock_entries(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock_entries(&self.entries).remove(key);
        Ok(())
    }
}

/// Typed access to the well-known keys. Reads never fail: a missing or malformed
/// value falls back to the default for that key.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    pub fn load_tasks(&self) -> Vec<Task> {
        self.read_entries(KEY_TASKS).unwrap_or_default()
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.write_json(KEY_TASKS, &tasks)
    }

    /// Stored lists, or the system lists when nothing usable is stored.
    pub fn load_lists(&self) -> Vec<List> {
        self.read_entries(KEY_LISTS)
            .unwrap_or_else(List::system_lists)
    }

    pub fn save_lists(&self, lists: &[List]) -> Result<(), StorageError> {
        self.write_json(KEY_LISTS, &lists)
    }

    pub fn load_user(&self) -> Option<AuthUser> {
        self.read_json(KEY_USER)
    }

    pub fn save_user(&self, user: Option<&AuthUser>) -> Result<(), StorageError> {
        match user {
            Some(user) => self.write_json(KEY_USER, user),
            None => self.backend.remove(KEY_USER),
        }
    }

    pub fn load_flag(&self, key: &str) -> bool {
        matches!(self.read_raw(key).as_deref(), Some("true"))
    }

    pub fn save_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.backend.set(key, if value { "true" } else { "false" })
    }

    pub fn load_theme(&self) -> ThemeMode {
        self.read_raw(KEY_THEME)
            .and_then(|value| ThemeMode::parse(&value))
            .unwrap_or_default()
    }

    pub fn save_theme(&self, theme: ThemeMode) -> Result<(), StorageError> {
        self.backend.set(KEY_THEME, theme.as_str())
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("storage read failed key={key} err={err}");
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring malformed stored value key={key} err={err}");
                None
            }
        }
    }

    /// Decodes a stored array entry by entry, skipping the entries that do not decode.
    /// `None` when the key is missing or does not hold an array.
    fn read_entries<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let entries: Vec<serde_json::Value> = self.read_json(key)?;
        let total = entries.len();
        let decoded: Vec<T> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(value) => Some(value),
                Err(err) => {
                    log::warn!("skipping unreadable stored entry key={key} index={index} err={err}");
                    None
                }
            })
            .collect();
        if decoded.len() < total {
            log::warn!("kept {} of {total} stored entries key={key}", decoded.len());
        }
        Some(decoded)
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set(key, &text)
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let mut file = File::open(path)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub(crate) fn write_atomic<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StorageError> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(data)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}
