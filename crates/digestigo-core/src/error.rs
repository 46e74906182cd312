use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestigoError {
    #[error("Failed to read storage key '{key}': {message}")]
    StorageRead { key: String, message: String },

    #[error("Failed to write storage key '{key}': {message}")]
    StorageWrite { key: String, message: String },

    #[error("Classifier unavailable: {message}")]
    ClassifierUnavailable { message: String },

    #[error("Classifier did not respond within {seconds}s")]
    ClassifierTimeout { seconds: u64 },

    #[error("Invalid category: '{name}' - expected symptom, dietary, trigger or general")]
    InvalidCategory { name: String },

    #[error("Config parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Unknown config key: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Invalid config value for {key}: {message}")]
    ConfigValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, DigestigoError>;

impl DigestigoError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StorageRead { .. } | Self::StorageWrite { .. } => 2,
            Self::ClassifierUnavailable { .. } | Self::ClassifierTimeout { .. } => 3,
            Self::InvalidCategory { .. } => 4,
            Self::ConfigParse { .. } | Self::ConfigKeyNotFound { .. } | Self::ConfigValue { .. } => {
                5
            }
            _ => 1,
        }
    }

    /// ストレージ層の失敗かどうか
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageRead { .. } | Self::StorageWrite { .. })
    }
}
