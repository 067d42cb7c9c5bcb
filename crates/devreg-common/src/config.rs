//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Shared primitives and utilities for the registry runtime."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_storage_path() -> Option<PathBuf> {
    Some(PathBuf::from("target/data/devices.json"))
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

/// Primary configuration object for the registry daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no configuration file was found and the
/// built-in defaults are in effect.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "DEVREG_CONFIG";

    /// Load configuration from disk, respecting the `DEVREG_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `DEVREG_CONFIG` path must exist. The candidate list is
    /// probed in order and the first existing file wins; if none exists the
    /// defaults are returned.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        Self::load_with_override(None, candidates)
    }

    /// Like [`AppConfig::load_with_source`], with an operator-supplied path
    /// (`--config`) checked after `DEVREG_CONFIG`. Both must exist.
    pub fn load_with_override<P: AsRef<Path>>(
        explicit: Option<&Path>,
        candidates: &[P],
    ) -> Result<LoadedAppConfig> {
        let env_path = std::env::var(Self::ENV_CONFIG_PATH)
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        if let Some(path) = env_path.or_else(|| explicit.map(Path::to_path_buf)) {
            let config = Self::from_path(&path)?;
            return Ok(LoadedAppConfig {
                config,
                source: Some(path),
            });
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
        }
    }
}

/// Which device store implementation the daemon runs against.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Volatile store, lost on restart.
    Memory,
    /// Snapshot file rewritten on every registration.
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend != StorageBackend::File {
            return Ok(());
        }
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("storage backend 'file' requires a path"))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") | Some("cbor") => Ok(()),
            _ => Err(anyhow!(
                "storage path {} must end in .json or .cbor",
                path.display()
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config.api.listen, default_api_listen());
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("target/data/devices.json"))
        );
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn parses_full_document() {
        let config = AppConfig::from_str(
            r#"
            [api]
            listen = "127.0.0.1:9000"

            [storage]
            backend = "file"
            path = "/var/lib/devreg/devices.cbor"

            [logging]
            directory = "/var/log/devreg"
            format = "pretty"
            file_prefix = "devreg"

            [metrics]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.api.listen.port(), 9000);
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("/var/lib/devreg/devices.cbor"))
        );
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.file_prefix.as_deref(), Some("devreg"));
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn memory_backend_ignores_path() {
        let config = AppConfig::from_str(
            r#"
            [storage]
            backend = "memory"
            path = "devices.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn rejects_unknown_snapshot_extension() {
        let err = AppConfig::from_str(
            r#"
            [storage]
            path = "devices.yaml"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains(".json or .cbor"));
    }

    #[test]
    fn load_falls_back_to_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let loaded = AppConfig::load_with_source(&[missing]).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.api.listen, default_api_listen());
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(&second, "[api]\nlisten = \"127.0.0.1:7001\"\n").unwrap();
        let loaded = AppConfig::load_with_source(&[first, second.clone()]).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(second.as_path()));
        assert_eq!(loaded.config.api.listen.port(), 7001);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback.toml");
        fs::write(&fallback, "").unwrap();
        let missing = dir.path().join("typo.toml");

        let err =
            AppConfig::load_with_override(Some(missing.as_path()), &[fallback]).unwrap_err();
        assert!(err.to_string().contains("unable to read config file"));
    }

    #[test]
    fn explicit_path_wins_over_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let candidate = dir.path().join("candidate.toml");
        fs::write(&explicit, "[api]\nlisten = \"127.0.0.1:7002\"\n").unwrap();
        fs::write(&candidate, "[api]\nlisten = \"127.0.0.1:7003\"\n").unwrap();

        let loaded =
            AppConfig::load_with_override(Some(explicit.as_path()), &[candidate]).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(explicit.as_path()));
        assert_eq!(loaded.config.api.listen.port(), 7002);
    }
}
