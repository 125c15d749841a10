use serde::{Deserialize, Serialize};

/// Top-level application settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

/// Where the local platform keeps its SQLite file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSettings {
    /// Explicit database file. `None` means `<data dir>/smart-bookmark.db`.
    pub database_path: Option<String>,
}

/// Log output configuration for the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: false,
        }
    }
}

/// Identity provider presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// Provider label shown on the landing view.
    pub provider: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            provider: "Google".to_string(),
        }
    }
}
