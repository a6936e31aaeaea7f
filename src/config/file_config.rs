use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub content_cache_age_sec: Option<usize>,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: Option<u64>,

    // Feature configs
    pub sync: Option<SyncConfig>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub max_batch_size: Option<usize>,
    pub op_retention_days: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub allow_registration: Option<bool>,
    /// Tokens not used for this many days are pruned.
    pub token_unused_days: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            port = 4000
            logging_level = "body"

            [sync]
            max_batch_size = 25

            [auth]
            allow_registration = false
            "#,
        )
        .unwrap();
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.sync.unwrap().max_batch_size, Some(25));
        let auth = config.auth.unwrap();
        assert_eq!(auth.allow_registration, Some(false));
        assert_eq!(auth.token_unused_days, None);
    }

    #[test]
    fn empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.sync.is_none());
    }
}
