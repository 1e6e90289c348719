//! Export configuration, validated once at startup.
//!
//! Values come from an optional YAML file layered under `LIVETRACK_*`
//! environment variables. Every problem is collected so a single error names
//! all offending keys.

use action_primitives::ErrorKind;
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const ENV_PREFIX: &str = "LIVETRACK";
pub const DEFAULT_ROWS: u32 = 1000;
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_NETWORK_IDLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DOM_STABLE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DOWNLOAD_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(String),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigurationError
    }
}

/// Validated configuration of one export run.
#[derive(Clone)]
pub struct ExportConfig {
    pub portal_url: Url,
    pub username: String,
    pub password: String,
    pub timeframe: String,
    pub view: String,
    pub rows: u32,
    pub download_dir: PathBuf,
    pub chrome_executable: Option<PathBuf>,
    pub network_idle_timeout_ms: u64,
    pub dom_stable_timeout_ms: u64,
    pub download_timeout_ms: u64,
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("portal_url", &self.portal_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeframe", &self.timeframe)
            .field("view", &self.view)
            .field("rows", &self.rows)
            .field("download_dir", &self.download_dir)
            .field("chrome_executable", &self.chrome_executable)
            .field("network_idle_timeout_ms", &self.network_idle_timeout_ms)
            .field("dom_stable_timeout_ms", &self.dom_stable_timeout_ms)
            .field("download_timeout_ms", &self.download_timeout_ms)
            .finish()
    }
}

/// Unvalidated view of the merged sources; every field is text.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    portal_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeframe: Option<String>,
    view: Option<String>,
    rows: Option<String>,
    download_dir: Option<String>,
    chrome_executable: Option<String>,
    network_idle_timeout_ms: Option<String>,
    dom_stable_timeout_ms: Option<String>,
    download_timeout_ms: Option<String>,
}

impl ExportConfig {
    /// Load from `file` (if given) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(file, None)
    }

    /// Load from `file` and an explicit environment map instead of the process
    /// environment when `env` is `Some`.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            if !path.exists() {
                return Err(ConfigError::Source(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).source(env));

        let raw: RawConfig = builder
            .build()
            .and_then(Config::try_deserialize::<RawConfig>)
            .map_err(|err| ConfigError::Source(err.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let portal_url = match non_empty(raw.portal_url) {
            None => {
                problems.push("portal_url is required".to_string());
                None
            }
            Some(text) => match Url::parse(&text) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    problems.push(format!(
                        "portal_url must use http or https (got {})",
                        url.scheme()
                    ));
                    None
                }
                Err(err) => {
                    problems.push(format!("portal_url is not an absolute URL: {err}"));
                    None
                }
            },
        };

        let mut required = |key: &str, value: Option<String>| {
            let value = non_empty(value);
            if value.is_none() {
                problems.push(format!("{key} is required"));
            }
            value.unwrap_or_default()
        };
        let username = required("username", raw.username);
        let password = required("password", raw.password);
        let timeframe = required("timeframe", raw.timeframe);
        let view = required("view", raw.view);

        let rows = positive("rows", raw.rows, u64::from(DEFAULT_ROWS), &mut problems);
        let rows = match u32::try_from(rows) {
            Ok(rows) => rows,
            Err(_) => {
                problems.push(format!("rows must not exceed {}", u32::MAX));
                DEFAULT_ROWS
            }
        };
        let network_idle_timeout_ms = positive(
            "network_idle_timeout_ms",
            raw.network_idle_timeout_ms,
            DEFAULT_NETWORK_IDLE_TIMEOUT_MS,
            &mut problems,
        );
        let dom_stable_timeout_ms = positive(
            "dom_stable_timeout_ms",
            raw.dom_stable_timeout_ms,
            DEFAULT_DOM_STABLE_TIMEOUT_MS,
            &mut problems,
        );
        let download_timeout_ms = positive(
            "download_timeout_ms",
            raw.download_timeout_ms,
            DEFAULT_DOWNLOAD_TIMEOUT_MS,
            &mut problems,
        );

        let (Some(portal_url), true) = (portal_url, problems.is_empty()) else {
            return Err(ConfigError::Invalid(problems));
        };

        Ok(Self {
            portal_url,
            username,
            password,
            timeframe,
            view,
            rows,
            download_dir: non_empty(raw.download_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            chrome_executable: non_empty(raw.chrome_executable).map(PathBuf::from),
            network_idle_timeout_ms,
            dom_stable_timeout_ms,
            download_timeout_ms,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive(key: &str, value: Option<String>, default: u64, problems: &mut Vec<String>) -> u64 {
    match non_empty(value) {
        None => default,
        Some(text) => match text.parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                problems.push(format!("{key} must be a positive integer (got '{text}')"));
                default
            }
        },
    }
}
