mod file_config;

pub use file_config::{AuthConfig, FileConfig, SyncConfig};

use crate::server::RequestsLoggingLevel;
use crate::sync::DEFAULT_MAX_BATCH_SIZE;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: u64,
    pub sync_retention_days: u64,
    pub token_unused_days: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: u64,

    // Feature configs (with defaults)
    pub sync: SyncSettings,
    pub auth: AuthSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);

        let sync_file = file.sync.unwrap_or_default();
        let sync = SyncSettings {
            max_batch_size: sync_file.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            op_retention_days: sync_file
                .op_retention_days
                .unwrap_or(cli.sync_retention_days),
        };
        if sync.max_batch_size == 0 {
            bail!("sync.max_batch_size must be at least 1");
        }

        let auth_file = file.auth.unwrap_or_default();
        let auth = AuthSettings {
            allow_registration: auth_file.allow_registration.unwrap_or(true),
            token_unused_days: auth_file
                .token_unused_days
                .unwrap_or(cli.token_unused_days),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            prune_interval_hours,
            sync,
            auth,
        })
    }

    pub fn songbook_db_path(&self) -> PathBuf {
        self.db_dir.join("songbook.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn sync_db_path(&self) -> PathBuf {
        self.db_dir.join("sync.db")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub max_batch_size: usize,
    pub op_retention_days: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            op_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub allow_registration: bool,
    pub token_unused_days: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            allow_registration: true,
            token_unused_days: 90,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
