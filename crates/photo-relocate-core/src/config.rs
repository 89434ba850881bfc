use crate::relocator::retry::{Backoff, RetryPolicy};
use crate::relocator::wait::WaitPolicy;
use crate::relocator::RelocationMode;
use crate::scanner::EnumerationPolicy;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LEDGER_FILE_NAME: &str = "file_indices.csv";
pub const DEFAULT_FAILURE_LOG_FILE_NAME: &str = "failed-relocations-paths.log";
const ENV_PREFIX: &str = "PHOTO_RELOCATE";
const LIST_KEYS: [&str; 3] = ["source_roots", "excluded_extensions", "ignore_patterns"];
/// Largest copy buffer accepted from configuration.
pub const MAX_BUFFER_SIZE_MB: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent directories of the media files, walked in this order.
    pub source_roots: Vec<PathBuf>,
    /// Where relocated files land, mirroring each file's path under its source root.
    pub dest_root: PathBuf,
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    #[serde(default)]
    pub failure_log_path: Option<PathBuf>,
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub mode: RelocationMode,
    #[serde(default = "default_buffer_size_mb")]
    pub buffer_size_mb: usize,
    #[serde(default)]
    pub on_unreadable_dir: EnumerationPolicy,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub wait: WaitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: BackoffKind,
    pub factor: f64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub poll_interval_ms: u64,
    /// `0` waits forever.
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
            backoff: BackoffKind::Fixed,
            factor: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            timeout_ms: 600_000,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        let backoff = match settings.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                factor: settings.factor,
            },
        };
        RetryPolicy {
            max_attempts: settings.max_attempts,
            delay: Duration::from_millis(settings.delay_ms),
            backoff,
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl From<&WaitSettings> for WaitPolicy {
    fn from(settings: &WaitSettings) -> Self {
        WaitPolicy {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            timeout: (settings.timeout_ms > 0).then(|| Duration::from_millis(settings.timeout_ms)),
        }
    }
}

fn default_excluded_extensions() -> Vec<String> {
    ["html", "xml", "txt", "json", "pdf"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_buffer_size_mb() -> usize {
    50
}

impl AppConfig {
    /// Minimal configuration with every optional setting at its default.
    pub fn new(source_roots: Vec<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_roots,
            dest_root: dest_root.into(),
            ledger_path: None,
            failure_log_path: None,
            excluded_extensions: default_excluded_extensions(),
            ignore_patterns: Vec::new(),
            mode: RelocationMode::default(),
            buffer_size_mb: default_buffer_size_mb(),
            on_unreadable_dir: EnumerationPolicy::default(),
            retry: RetrySettings::default(),
            wait: WaitSettings::default(),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.dest_root.join(DEFAULT_LEDGER_FILE_NAME))
    }

    pub fn failure_log_path(&self) -> PathBuf {
        self.failure_log_path
            .clone()
            .unwrap_or_else(|| self.dest_root.join(DEFAULT_FAILURE_LOG_FILE_NAME))
    }

    pub fn buffer_size_bytes(&self) -> usize {
        self.buffer_size_mb
            .min(MAX_BUFFER_SIZE_MB)
            .saturating_mul(1024 * 1024)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::from(&self.wait)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_roots.is_empty() {
            return Err(ConfigError::Message(
                "at least one entry in source_roots is required".to_string(),
            ));
        }
        if self.dest_root.as_os_str().is_empty() {
            return Err(ConfigError::Message("dest_root must not be empty".to_string()));
        }
        if self.buffer_size_mb == 0 || self.buffer_size_mb > MAX_BUFFER_SIZE_MB {
            return Err(ConfigError::Message(format!(
                "buffer_size_mb must be between 1 and {}",
                MAX_BUFFER_SIZE_MB
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `Config.toml` from the working directory (if present), overlaid by
/// `PHOTO_RELOCATE_*` environment variables. Nested keys use `__`, e.g.
/// `PHOTO_RELOCATE_RETRY__MAX_ATTEMPTS=5`.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    build(ConfigFile::with_name("Config").required(false), environment())
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    build(ConfigFile::from(path).required(true), environment())
}

/// `PHOTO_RELOCATE_*` variables. List keys take comma-separated values.
fn environment() -> Environment {
    let mut env = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        env = env.with_list_parse_key(key);
    }
    env
}

fn build<S>(file: S, env: Environment) -> Result<AppConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = Config::builder().add_source(file).add_source(env).build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
