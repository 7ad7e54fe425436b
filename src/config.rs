//! Configuration Management
//!
//! Handles persistent configuration storage for aws-backup-report.

use crate::aws::ClientOptions;
use crate::fetcher::{FetchOptions, DEFAULT_LOOKBACK_DAYS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Named AWS profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Job lookback window in days
    #[serde(default)]
    pub lookback_days: Option<u32>,
    /// Where report files are written
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// AWS Backup endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aws-backup-report").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective region (CLI > config); `None` defers to the AWS region chain
    pub fn effective_region(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.region.clone())
    }

    /// Get effective profile (CLI > config); `None` lets credential resolution decide
    pub fn effective_profile(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.profile.clone())
    }

    pub fn effective_lookback_days(&self, cli: Option<u32>) -> u32 {
        cli.or(self.lookback_days).unwrap_or(DEFAULT_LOOKBACK_DAYS)
    }

    pub fn effective_output_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Transport settings, with an optional CLI endpoint override
    pub fn client_options(&self, endpoint: Option<&str>) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            endpoint: endpoint.map(str::to_string).or_else(|| self.endpoint.clone()),
            timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_base_delay: defaults.retry_base_delay,
        }
    }

    pub fn fetch_options(&self, lookback_days: u32) -> FetchOptions {
        FetchOptions {
            lookback_days,
            ..FetchOptions::default()
        }
    }

    /// Set region and save
    pub fn set_region(&mut self, region: &str) -> Result<()> {
        self.region = Some(region.to_string());
        self.save()
    }
}
