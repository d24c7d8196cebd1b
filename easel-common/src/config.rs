//! Configuration loading
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (applied by the binaries via clap, incl. `env = ...`)
//! 2. Environment variable (same clap mechanism)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults are used. A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EASEL_CONFIG";

/// Top-level configuration shared by easel-etl and easel-query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaselConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Default tracing directive (overridden by RUST_LOG)
    pub log_level: String,
    pub sources: SourcesConfig,
    pub server: ServerConfig,
}

impl Default for EaselConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: "info".to_string(),
            sources: SourcesConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Batch input files and their column layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Relative source paths are resolved against this directory
    pub data_dir: PathBuf,
    /// Free-text file, one `"Title" (Month Day, Year)` entry per line
    pub dates_file: PathBuf,
    /// CSV with title, season, episode and a list-literal of materials
    pub materials_file: PathBuf,
    /// CSV with a title column and one 0/1 flag column per tag
    pub tags_file: PathBuf,
    pub material_columns: MaterialColumns,
    pub tag_title_column: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dates_file: PathBuf::from("The Joy Of Painting - Episode Dates"),
            materials_file: PathBuf::from("The Joy Of Painiting - Colors Used(1)"),
            tags_file: PathBuf::from("The Joy Of Painiting - Subject Matter"),
            material_columns: MaterialColumns::default(),
            tag_title_column: "TITLE".to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn dates_path(&self) -> PathBuf {
        self.resolve(&self.dates_file)
    }

    pub fn materials_path(&self) -> PathBuf {
        self.resolve(&self.materials_file)
    }

    pub fn tags_path(&self) -> PathBuf {
        self.resolve(&self.tags_file)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}

/// Column names in the materials CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialColumns {
    pub title: String,
    pub season: String,
    pub episode: String,
    pub materials: String,
}

impl Default for MaterialColumns {
    fn default() -> Self {
        Self {
            title: "painting_title".to_string(),
            season: "season".to_string(),
            episode: "episode".to_string(),
            materials: "colors".to_string(),
        }
    }
}

/// HTTP listener for easel-query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl EaselConfig {
    /// Load configuration
    ///
    /// Lookup order: explicit path, then `EASEL_CONFIG`, then the platform
    /// config file. An explicit or env-named file must exist; a missing
    /// platform file falls back to compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = named {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                warn!(
                    "No config file at {} - using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory - using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML config file; absent keys take compiled defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Platform config file: `<config dir>/easel/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("easel").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("easel"))
        .unwrap_or_else(|| PathBuf::from("./easel_data"))
        .join("easel.db")
}
