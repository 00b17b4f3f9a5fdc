use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    pub primary_store_path: PathBuf,
    pub secret_store_path: PathBuf,
    pub protection_password: SecretString,
    #[serde(default = "default_identity_alias")]
    pub identity_alias: String,
    #[serde(default = "default_api_key_alias")]
    pub api_key_alias: String,
    /// Additional secret-store aliases seeded with random material at bootstrap.
    #[serde(default)]
    pub extra_seed_aliases: Vec<String>,
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_identity_alias() -> String {
    "app-cert".to_string()
}

fn default_api_key_alias() -> String {
    "api-key".to_string()
}

/// Distinguished-name components and validity window for the bootstrap identity.
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_cn")]
    pub common_name: String,
    #[serde(default = "default_identity_org")]
    pub organization: String,
    #[serde(default = "default_identity_locality")]
    pub locality: String,
    #[serde(default = "default_identity_state")]
    pub state: String,
    #[serde(default = "default_identity_country")]
    pub country: String,
    #[serde(default = "default_identity_validity")]
    pub validity_days: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            common_name: default_identity_cn(),
            organization: default_identity_org(),
            locality: default_identity_locality(),
            state: default_identity_state(),
            country: default_identity_country(),
            validity_days: default_identity_validity(),
        }
    }
}

fn default_identity_cn() -> String {
    "LegacyApp".to_string()
}

fn default_identity_org() -> String {
    "Example Organization".to_string()
}

fn default_identity_locality() -> String {
    "City".to_string()
}

fn default_identity_state() -> String {
    "State".to_string()
}

fn default_identity_country() -> String {
    "US".to_string()
}

fn default_identity_validity() -> u32 {
    365 // 1 year
}

impl VaultConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        let config: VaultConfig =
            toml::from_str(&config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration with default path (config.toml)
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }
}
