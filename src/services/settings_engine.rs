// Smart Bookmark Settings Engine
// Loads, saves and edits the JSON settings document kept in the platform config dir.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::AppSettings;

/// Overrides the directory holding the database file.
pub const DATA_DIR_ENV: &str = "SMART_BOOKMARK_DATA_DIR";

const DATABASE_FILE: &str = "smart-bookmark.db";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// `path_override` replaces the default `<config dir>/settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string()
        });

        Self {
            config_path,
            settings: AppSettings::default(),
        }
    }

    /// Builds an engine around already-known settings without touching disk.
    pub fn with_settings(config_path: String, settings: AppSettings) -> Self {
        Self {
            config_path,
            settings,
        }
    }

    /// Resolves the database file location.
    ///
    /// An explicit `storage.database_path` wins, then `$SMART_BOOKMARK_DATA_DIR`,
    /// then the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.settings.storage.database_path {
            return PathBuf::from(path);
        }
        match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(DATABASE_FILE),
            _ => platform::get_data_dir().join(DATABASE_FILE),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings, creating parent directories as needed.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates one setting by dot-notation path (`"logging.filter"`) and saves.
    ///
    /// The new document must still deserialize into `AppSettings`.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Err(SettingsError::InvalidKey("Key cannot be empty".to_string())),
        };

        let mut current = &mut json_value;
        for part in parents {
            current = current.get_mut(*part).ok_or_else(|| {
                SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
            })?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(*last) => {
                map.insert(last.to_string(), value);
            }
            serde_json::Value::Object(_) => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in settings",
                    key
                )));
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Cannot navigate to key '{}': intermediate value is not an object",
                    key
                )));
            }
        }

        let new_settings: AppSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.settings = new_settings;
        self.save()?;

        Ok(())
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppSettings::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
