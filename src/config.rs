//! Server configuration loaded from TOML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub point_search: PointSearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Create missing tables at startup
        #[serde(default)]
        ensure_schema: bool,
    },
    /// CSV exports loaded into memory
    Csv { dir: PathBuf },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointSearchConfig {
    WardsApi {
        url: String,
        #[serde(default = "default_wards_database")]
        database: String,
    },
    /// Local GeoJSON ward boundaries
    Boundaries {
        path: PathBuf,
        #[serde(default = "default_code_property")]
        code_property: String,
    },
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_wards_database() -> String {
    "wards_2011".to_string()
}

fn default_code_property() -> String {
    "ward_code".to_string()
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }
}
