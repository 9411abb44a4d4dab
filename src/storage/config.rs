//! Configuration handling for gtbook
//!
//! User configuration lives in `config.toml` under the platform config
//! directory (e.g. `~/.config/gtbook/config.toml`). Set `GTBOOK_CONFIG` to
//! point at a different file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::content::StubStyle;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "GTBOOK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Initial contents of new chapter files
    pub content_stub: StubStyle,

    /// Book roots listed by `gtbook books`
    pub workspace: Vec<PathBuf>,
}

/// Loaded configuration and where it came from
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from `GTBOOK_CONFIG` or the platform config dir
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self {
                global: GlobalConfig::default(),
                path: None,
            }),
        }
    }

    /// Loads configuration from a specific file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let global = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;

            toml::from_str::<GlobalConfig>(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            GlobalConfig::default()
        };

        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Returns the config file location
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "gtbook", "gtbook").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Saves the configuration to the file it was loaded from
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content =
            toml::to_string_pretty(&self.global).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    /// Adds a book root to the workspace list; returns false if already present
    pub fn add_to_workspace(&mut self, root: &Path) -> bool {
        if self.global.workspace.iter().any(|p| p == root) {
            return false;
        }
        self.global.workspace.push(root.to_path_buf());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = GlobalConfig::default();

        assert_eq!(config.default_format, OutputFormat::Text);
        assert_eq!(config.content_stub, StubStyle::Heading);
        assert!(config.workspace.is_empty());
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
content_stub = "blank"
workspace = ["/books/novel", "/books/notes"]
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.content_stub, StubStyle::Blank);
        assert_eq!(config.workspace.len(), 2);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.global, GlobalConfig::default());
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_format = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::load_from(&path).unwrap();

        assert!(config.add_to_workspace(Path::new("/books/a")));
        assert!(!config.add_to_workspace(Path::new("/books/a")));
        config.global.content_stub = StubStyle::Blank;
        config.save().unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.global, config.global);
    }
}
