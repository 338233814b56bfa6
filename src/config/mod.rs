//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::auth::store::default_spectra_dir;
use crate::error::{Result, SpectraError};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:80";
pub const DEFAULT_APP_NAME: &str = "spectra-agent";

/// Client configuration.
///
/// Resolution order, highest first:
/// 1. Values set in code (builder or field assignment)
/// 2. Environment variables (a `.env` file is honored)
/// 3. `~/.spectra/config.toml`, or the file named by `SPECTRA_CONFIG`
/// 4. Built-in defaults
///
/// # Example
/// ```
/// use spectra::config::SpectraConfig;
///
/// let config = SpectraConfig::builder()
///     .backend_url("https://spectra.example.com")
///     .build();
/// assert_eq!(config.app_name, "spectra-agent");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct SpectraConfig {
    #[builder(into, default = DEFAULT_BACKEND_URL.to_string())]
    pub backend_url: String,
    /// Agent application name used in agent-service paths and run requests.
    #[builder(into, default = DEFAULT_APP_NAME.to_string())]
    pub app_name: String,
    /// Applies to REST calls only; agent streams run until the server closes them.
    #[builder(default = Duration::from_secs(120))]
    pub request_timeout: Duration,
    /// Warm-up between a successful start and the session being usable.
    #[builder(default = Duration::from_secs(10))]
    pub ready_delay: Duration,
    #[builder(default = default_spectra_dir())]
    pub token_dir: PathBuf,
}

impl Default for SpectraConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// On-disk representation; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub backend_url: Option<String>,
    pub app_name: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub ready_delay_secs: Option<u64>,
    pub token_dir: Option<PathBuf>,
}

impl SpectraConfig {
    /// Defaults, then the config file (if present), then the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();

        let path = std::env::var_os("SPECTRA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_spectra_dir().join("config.toml"));
        if path.exists() {
            config.apply_file(Self::read_file(&path)?);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables only.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn read_file(path: &Path) -> Result<ConfigFile> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            SpectraError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.backend_url {
            self.backend_url = url;
        }
        if let Some(app) = file.app_name {
            self.app_name = app;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.ready_delay_secs {
            self.ready_delay = Duration::from_secs(secs);
        }
        if let Some(dir) = file.token_dir {
            self.token_dir = dir;
        }
    }

    /// Overlay values from an environment lookup.
    ///
    /// `SPECTRA_BACKEND_URL` wins over `VITE_BACKEND_URL`, which is accepted so
    /// an existing web `.env` can be reused.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SPECTRA_BACKEND_URL").or_else(|| lookup("VITE_BACKEND_URL")) {
            self.backend_url = url;
        }
        if let Some(app) = lookup("SPECTRA_APP_NAME") {
            self.app_name = app;
        }
        if let Some(secs) = lookup("SPECTRA_REQUEST_TIMEOUT_SECS") {
            let secs = parse_secs("SPECTRA_REQUEST_TIMEOUT_SECS", &secs)?;
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("SPECTRA_READY_DELAY_SECS") {
            self.ready_delay = Duration::from_secs(parse_secs("SPECTRA_READY_DELAY_SECS", &secs)?);
        }
        if let Some(dir) = lookup("SPECTRA_TOKEN_DIR") {
            self.token_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Absolute URL for a backend path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            SpectraError::Configuration(format!(
                "{key} must be a whole number of seconds, got '{value}'"
            ))
        })
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_local_backend() {
        let config = SpectraConfig::default();
        assert_eq!(config.backend_url, "http://localhost:80");
        assert_eq!(config.app_name, "spectra-agent");
        assert_eq!(config.ready_delay, Duration::from_secs(10));
    }

    #[test]
    fn spectra_backend_url_wins_over_vite() {
        let mut config = SpectraConfig::default();
        config
            .apply_env(env(&[
                ("VITE_BACKEND_URL", "http://vite"),
                ("SPECTRA_BACKEND_URL", "http://spectra"),
            ]))
            .unwrap();
        assert_eq!(config.backend_url, "http://spectra");

        let mut config = SpectraConfig::default();
        config.apply_env(env(&[("VITE_BACKEND_URL", "http://vite")])).unwrap();
        assert_eq!(config.backend_url, "http://vite");
    }

    #[test]
    fn invalid_durations_are_configuration_errors() {
        let mut config = SpectraConfig::default();
        let err = config
            .apply_env(env(&[("SPECTRA_READY_DELAY_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, SpectraError::Configuration(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = SpectraConfig::builder()
            .backend_url("http://host:8080/")
            .build();
        assert_eq!(config.endpoint("/start-session"), "http://host:8080/start-session");
        assert_eq!(config.endpoint("agent/run_sse"), "http://host:8080/agent/run_sse");
    }
}
