use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::worker::DEFAULT_USER_AGENT;

/// Global configuration loaded from `~/.config/downtraffic/config.toml`.
/// Command-line flags take precedence over every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DtConfig {
    /// Number of concurrent download workers.
    pub workers: usize,
    /// URL list file (one URL per line). None = built-in list.
    pub url_file: Option<PathBuf>,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Pause after a failed download, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Stop-condition poll interval in milliseconds (must be below 1000).
    pub monitor_interval_ms: u64,
    /// Progress line refresh interval in milliseconds.
    pub report_interval_ms: u64,
    /// Receive buffer in bytes (None = libcurl default).
    pub buffer_size: Option<usize>,
    /// Interface used by parity mode when none is given. None = auto-detect.
    pub default_interface: Option<String>,
}

impl Default for DtConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            url_file: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_backoff_ms: 2_000,
            monitor_interval_ms: 500,
            report_interval_ms: 1_000,
            buffer_size: None,
            default_interface: None,
        }
    }
}

impl DtConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.monitor_interval_ms == 0 || self.monitor_interval_ms >= 1_000 {
            bail!(
                "monitor_interval_ms must be between 1 and 999 (got {})",
                self.monitor_interval_ms
            );
        }
        if self.report_interval_ms == 0 {
            bail!("report_interval_ms must be greater than 0");
        }
        if self.buffer_size == Some(0) {
            bail!("buffer_size must be greater than 0");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("downtraffic")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DtConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<DtConfig> {
    if !path.exists() {
        let default_cfg = DtConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: DtConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DtConfig::default();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.retry_backoff_ms, 2_000);
        assert_eq!(cfg.monitor_interval_ms, 500);
        assert_eq!(cfg.report_interval_ms, 1_000);
        assert!(cfg.url_file.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_partial_file_keeps_defaults() {
        let toml = r#"
            workers = 16
            url_file = "/etc/downtraffic/urls.txt"
            buffer_size = 65536
        "#;
        let cfg: DtConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 16);
        assert_eq!(cfg.url_file, Some(PathBuf::from("/etc/downtraffic/urls.txt")));
        assert_eq!(cfg.buffer_size, Some(65536));
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.monitor_interval_ms, 500);
        assert!(cfg.default_interface.is_none());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = DtConfig {
            workers: 0,
            ..DtConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.workers = 1;
        cfg.monitor_interval_ms = 1_000;
        assert!(cfg.validate().is_err());
        cfg.monitor_interval_ms = 250;
        cfg.report_interval_ms = 0;
        assert!(cfg.validate().is_err());
        cfg.report_interval_ms = 1_000;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_or_init_creates_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert_eq!(created, DtConfig::default());
        assert!(path.exists());

        fs::write(&path, "workers = 2\ndefault_interface = \"ens3\"\n").unwrap();
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.default_interface.as_deref(), Some("ens3"));
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "monitor_interval_ms = 5000\n").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("monitor_interval_ms"));
    }
}
