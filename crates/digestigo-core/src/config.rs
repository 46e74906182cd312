use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationRequestBuilder;
use crate::error::{DigestigoError, Result};

const CONFIG_FILE: &str = "config.toml";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# digestigo configuration file
# Location: ~/.digestigo/config.toml

[classifier]
# Command that receives the prompt on stdin and prints the reply
# Default: "claude"
command = "claude"

# Arguments passed to the command
# Default: ["--print"]
args = ["--print"]

# Seconds to wait for a reply before giving up (0 = no limit)
# Default: 30
timeout_secs = 30

# Sampling temperature for categorization requests
# Default: 0.15
temperature = 0.15

# Maximum tokens for categorization replies
# Default: 200
max_tokens = 200

[storage]
# Data directory (relative paths are resolved against the base directory)
# Default: "data"
dir = "data"
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Classifier-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--print".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.15
}

fn default_max_tokens() -> u32 {
    200
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

impl ClassifierConfig {
    /// Timeout as a Duration (`None` when disabled)
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn request_builder(&self) -> ClassificationRequestBuilder {
        ClassificationRequestBuilder::new(self.temperature, self.max_tokens)
    }
}

impl Config {
    /// Load config from base directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content).map_err(|e| DigestigoError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Save config to base directory
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        let content = toml::to_string_pretty(self).map_err(|e| DigestigoError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::write(&path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }

    /// Resolve the data directory against the base directory
    pub fn data_dir(&self, base_dir: &Path) -> PathBuf {
        if self.storage.dir.is_absolute() {
            self.storage.dir.clone()
        } else {
            base_dir.join(&self.storage.dir)
        }
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        self.list()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "classifier.command" => {
                let command = value.trim();
                if command.is_empty() {
                    return Err(invalid_value(key, "command must not be empty"));
                }
                self.classifier.command = command.to_string();
            }
            "classifier.args" => self.classifier.args = parse_string_list(value)?,
            "classifier.timeout_secs" => {
                self.classifier.timeout_secs = parse_number(key, value)?;
            }
            "classifier.temperature" => {
                let temperature: f32 = parse_number(key, value)?;
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(invalid_value(key, "temperature must be between 0.0 and 2.0"));
                }
                self.classifier.temperature = temperature;
            }
            "classifier.max_tokens" => self.classifier.max_tokens = parse_number(key, value)?,
            "storage.dir" => self.storage.dir = PathBuf::from(value.trim()),
            _ => {
                return Err(DigestigoError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "classifier.command".to_string(),
                self.classifier.command.clone(),
            ),
            (
                "classifier.args".to_string(),
                format!("{:?}", self.classifier.args),
            ),
            (
                "classifier.timeout_secs".to_string(),
                self.classifier.timeout_secs.to_string(),
            ),
            (
                "classifier.temperature".to_string(),
                self.classifier.temperature.to_string(),
            ),
            (
                "classifier.max_tokens".to_string(),
                self.classifier.max_tokens.to_string(),
            ),
            (
                "storage.dir".to_string(),
                self.storage.dir.display().to_string(),
            ),
        ]
    }
}

fn invalid_value(key: &str, message: &str) -> DigestigoError {
    DigestigoError::ConfigValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid_value(key, &e.to_string()))
}

/// Parse a comma-separated or JSON-like list string
fn parse_string_list(value: &str) -> Result<Vec<String>> {
    let trimmed = value.trim();

    // Try JSON array format first: ["a", "b"]
    let inner = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let items: Vec<String> = inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Ok(items)
}
