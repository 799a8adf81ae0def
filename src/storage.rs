use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Key under which the active conversation id is stored
pub const CURRENT_CHAT_KEY: &str = "currentChatId";

/// Small persistent key-value store backed by a JSON object file
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string value, `None` when the key or the file is missing
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(key)
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }

    /// Write a string value, creating the file if needed
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.write_entries(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)
            .context("Failed to read local state")?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content).context("Failed to parse local state")? {
            Value::Object(entries) => Ok(entries),
            _ => Ok(Map::new()),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create local state directory")?;
        }

        let content = serde_json::to_string_pretty(entries)
            .context("Failed to serialize local state")?;
        fs::write(&self.path, content)
            .context("Failed to write local state")?;
        Ok(())
    }
}

/// The persisted identity of the conversation shown on screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveChatState {
    pub current_chat_id: Option<String>,
}

impl ActiveChatState {
    pub fn load(store: &LocalStore) -> Result<Self> {
        Ok(Self {
            current_chat_id: store.get(CURRENT_CHAT_KEY)?,
        })
    }

    pub fn save(&self, store: &LocalStore) -> Result<()> {
        match &self.current_chat_id {
            Some(id) => store.set(CURRENT_CHAT_KEY, id),
            None => store.remove(CURRENT_CHAT_KEY),
        }
    }
}
