//! Cipherscreen Configuration
//!
//! Handles loading configuration from:
//! 1. CS_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.cipherscreen/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use cipherscreen_identity::Identity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".cipherscreen";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "./cipherscreen-db";
const DEFAULT_THRESHOLD_K: usize = 2;
const DEFAULT_THRESHOLD_N: usize = 3;
const DEFAULT_RELAY_INTERVAL_MS: u64 = 200;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CipherscreenConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub governance: GovernanceConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.into(),
            port: DEFAULT_API_PORT,
        }
    }
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.into()
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

/// Presentation mirror storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Mirror ledger contents into RocksDB for display
    #[serde(default = "default_true")]
    pub mirror: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
            mirror: true,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

fn default_true() -> bool {
    true
}

/// Reference engine and disclosure relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_threshold_k")]
    pub threshold_k: usize,
    #[serde(default = "default_threshold_n")]
    pub threshold_n: usize,
    /// How often the relay runs the committee and forwards disclosures
    #[serde(default = "default_relay_interval")]
    pub relay_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_k: DEFAULT_THRESHOLD_K,
            threshold_n: DEFAULT_THRESHOLD_N,
            relay_interval_ms: DEFAULT_RELAY_INTERVAL_MS,
        }
    }
}

fn default_threshold_k() -> usize {
    DEFAULT_THRESHOLD_K
}
fn default_threshold_n() -> usize {
    DEFAULT_THRESHOLD_N
}
fn default_relay_interval() -> u64 {
    DEFAULT_RELAY_INTERVAL_MS
}

/// Initial administrator set (hex identities)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub administrators: Vec<String>,
}

// ============================================================================
// Override Helpers
// ============================================================================

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Set field from override if present
fn override_string(lookup: Lookup<'_>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from override if present and parseable
fn override_parse<T: std::str::FromStr>(lookup: Lookup<'_>, key: &str, field: &mut T) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Truthy values are "1" and "true"
fn override_bool(lookup: Lookup<'_>, key: &str) -> Option<bool> {
    lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl CipherscreenConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine or the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.threshold_k == 0 || engine.threshold_k > engine.threshold_n {
            bail!(
                "Invalid committee: threshold_k must be in 1..={} (got {})",
                engine.threshold_n,
                engine.threshold_k
            );
        }
        if engine.relay_interval_ms == 0 {
            bail!("relay_interval_ms must be at least 1");
        }
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("CS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides(&mut self, lookup: Lookup<'_>) {
        // API
        override_string(lookup, "CS_API_HOST", &mut self.api.host);
        override_parse(lookup, "CS_API_PORT", &mut self.api.port);

        // Database
        override_string(lookup, "CS_DB_PATH", &mut self.database.path);
        if let Some(v) = override_bool(lookup, "CS_MIRROR") {
            self.database.mirror = v;
        }

        // Engine
        override_parse(lookup, "CS_THRESHOLD_K", &mut self.engine.threshold_k);
        override_parse(lookup, "CS_THRESHOLD_N", &mut self.engine.threshold_n);
        override_parse(
            lookup,
            "CS_RELAY_INTERVAL_MS",
            &mut self.engine.relay_interval_ms,
        );

        // Governance: comma-separated identities
        if let Some(v) = lookup("CS_ADMINS") {
            self.governance.administrators = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Parsed initial administrator set. At least one is required.
    pub fn administrator_identities(&self) -> Result<Vec<Identity>> {
        if self.governance.administrators.is_empty() {
            bail!("No administrators configured (governance.administrators or CS_ADMINS)");
        }
        self.governance
            .administrators
            .iter()
            .map(|s| {
                s.parse::<Identity>()
                    .with_context(|| format!("Invalid administrator identity: {}", s))
            })
            .collect()
    }

    /// Socket address string for the HTTP API
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.governance.administrators = vec!["<hex identity>".into()];
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}
