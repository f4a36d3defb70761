//! Configuration for the `lineage` binary.
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `LINEAGE_*` environment variables, then command-line flags.
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:8000"
//! timeout_secs = 10
//!
//! [simulation]
//! settle_ms = 1000
//!
//! [server]
//! port = 8000
//! rate_limit = 600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

// ── Types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceSettings,
    pub simulation: SimulationSettings,
    pub server: ServerSettings,
}

/// `[service]`: where the simulation backend lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// `[simulation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// How long the processing animation is held after each step.
    pub settle_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings { settle_ms: 1000 }
    }
}

/// `[server]`: settings for `lineage serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    /// Requests per minute per client IP.
    pub rate_limit: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            port: 8000,
            rate_limit: 600,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────

impl Config {
    /// Defaults overlaid with `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `LINEAGE_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LINEAGE_SERVICE_URL").filter(|v| !v.is_empty()) {
            self.service.base_url = url;
        }
        if let Some(v) = lookup("LINEAGE_SETTLE_MS") {
            self.simulation.settle_ms = parse_env("LINEAGE_SETTLE_MS", v)?;
        }
        if let Some(v) = lookup("LINEAGE_PORT") {
            self.server.port = parse_env("LINEAGE_PORT", v)?;
        }
        if let Some(v) = lookup("LINEAGE_RATE_LIMIT") {
            self.server.rate_limit = parse_env("LINEAGE_RATE_LIMIT", v)?;
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.simulation.settle_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.service.base_url, "http://localhost:8000");
        assert_eq!(c.settle(), Duration::from_millis(1000));
        assert_eq!(c.server.port, 8000);
        assert_eq!(c.server.rate_limit, 600);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let c: Config = toml::from_str("[simulation]\nsettle_ms = 250\n").unwrap();
        assert_eq!(c.simulation.settle_ms, 250);
        assert_eq!(c.service.timeout_secs, 10);
        assert_eq!(c.server.port, 8000);
    }

    #[test]
    fn env_overrides_file() {
        let mut c: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        c.apply_env(env(&[
            ("LINEAGE_PORT", "9100"),
            ("LINEAGE_SERVICE_URL", "http://svc:1"),
        ]))
        .unwrap();
        assert_eq!(c.server.port, 9100);
        assert_eq!(c.service.base_url, "http://svc:1");
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut c = Config::default();
        let err = c
            .apply_env(env(&[("LINEAGE_SETTLE_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("LINEAGE_SETTLE_MS"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
