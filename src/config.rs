//! Settings
//!
//! API credentials, model selection and saved prompts. Written by the
//! settings UI; the agent and the proxy only ever read a snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::actions::CustomPrompt;
use crate::error::DraftResult;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Stored settings, keyed the way the settings UI writes them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(alias = "api_key")]
    pub api_key: String,
    #[serde(alias = "base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(alias = "custom_prompts")]
    pub custom_prompts: Vec<CustomPrompt>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            custom_prompts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Load settings from a file, or defaults if it is missing or corrupt
    pub fn load_from(path: &Path) -> DraftResult<Self> {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                warn!("⚠️ Settings file corrupted or invalid, using defaults: {}", e);
                // Keep the corrupt file around for debugging
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save settings to a file
    pub fn save_to(&self, path: &Path) -> DraftResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Default settings file location
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("draftyfox")
        .join("settings.json")
}

/// Read access to the external settings store
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a frozen copy of the current settings
    async fn load(&self) -> DraftResult<Settings>;
}

/// Settings kept in a JSON file, re-read on every load
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new(settings_path())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> DraftResult<Settings> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Settings::load_from(&path))
            .await
            .map_err(|e| anyhow::anyhow!("settings loader panicked: {e}"))?
    }
}

/// In-memory store, for embedding hosts and tests
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Replace the stored settings, as the settings UI would
    pub fn replace(&self, settings: Settings) -> DraftResult<()> {
        *self.settings.write()? = settings;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> DraftResult<Settings> {
        Ok(self.settings.read()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.model, "gpt-4o");
        assert!(!settings.has_api_key());
        assert!(settings.custom_prompts.is_empty());
    }

    #[test]
    fn test_store_keys_are_camel_case() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "apiKey": "sk-ui",
                "baseUrl": "https://llm.example.com/v1",
                "model": "gpt-4o-mini",
                "customPrompts": [{"name": "Pirate", "prompt": "Talk like a pirate."}]
            }"#,
        )
        .expect("ui settings");
        assert_eq!(settings.api_key, "sk-ui");
        assert_eq!(settings.base_url, "https://llm.example.com/v1");
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.custom_prompts.len(), 1);

        let written = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(written["apiKey"], "sk-ui");
        assert!(written.get("api_key").is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"api_key":"sk-test"}"#).expect("partial settings");
        assert!(settings.has_api_key());
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not valid json").expect("write");

        let settings = Settings::load_from(&path).expect("graceful load");
        assert_eq!(settings, Settings::default());
        assert!(dir.path().join("settings.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("nested/settings.json"));
        assert_eq!(store.load().await.expect("defaults"), Settings::default());

        let settings = Settings {
            api_key: "sk-1".to_string(),
            custom_prompts: vec![CustomPrompt {
                name: "Pirate".to_string(),
                prompt: "Rewrite like a pirate.".to_string(),
            }],
            ..Settings::default()
        };
        settings.save_to(store.path()).expect("save");
        assert_eq!(store.load().await.expect("load"), settings);
    }

    #[tokio::test]
    async fn test_memory_store_replace() {
        let store = MemorySettingsStore::default();
        assert!(!store.load().await.expect("load").has_api_key());
        store
            .replace(Settings {
                api_key: "sk-2".to_string(),
                ..Settings::default()
            })
            .expect("replace");
        assert!(store.load().await.expect("load").has_api_key());
    }
}
