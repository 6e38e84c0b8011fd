//! Configuration types for trello-dump

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "TRELLGO_APIKEY";
/// Environment variable holding the API token
pub const ENV_API_TOKEN: &str = "TRELLGO_APITOK";
/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "TRELLGO_APIURL";

/// Export behavior configuration (output tree, card selection, concurrency)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Root directory that receives one sub-directory per board
    #[serde(default)]
    pub storage_dir: PathBuf,

    /// Include archived (closed) cards in the export (default: false)
    #[serde(default)]
    pub include_archived: bool,

    /// Place archived cards under `{board}/ARCHIVED/{list}/{card}` instead of
    /// suffixing the card directory with ` (ARCHIVED)` (default: false)
    #[serde(default)]
    pub split_archived: bool,

    /// Only export open cards carrying a label with this NAME
    ///
    /// Matched through the board search endpoint, not by label ID. Cannot be
    /// combined with `include_archived`.
    #[serde(default)]
    pub label_filter: Option<String>,

    /// Number of cards exported concurrently (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::new(),
            include_archived: false,
            split_archived: false,
            label_filter: None,
            concurrency: default_concurrency(),
        }
    }
}

/// API credentials (key + token pair)
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiCredentials {
    /// Developer API key
    pub key: String,
    /// User token authorizing read access
    pub token: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &redact(&self.key))
            .field("token", &redact(&self.token))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

impl ApiCredentials {
    /// Create credentials from a key and token
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
        }
    }

    /// Whether both key and token are present
    pub fn is_complete(&self) -> bool {
        !self.key.trim().is_empty() && !self.token.trim().is_empty()
    }

    /// Load credentials from `TRELLGO_APIKEY` / `TRELLGO_APITOK`
    ///
    /// Returns the credentials together with the optional `TRELLGO_APIURL` override.
    pub fn from_env() -> Result<(Self, Option<String>)> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<(Self, Option<String>)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(ENV_API_KEY).unwrap_or_default();
        let token = lookup(ENV_API_TOKEN).unwrap_or_default();
        let url = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty());

        let credentials = Self::new(key, token);
        if !credentials.is_complete() {
            return Err(Error::config(
                "credentials",
                format!("{ENV_API_KEY} and {ENV_API_TOKEN} must both be set"),
            ));
        }
        Ok((credentials, url))
    }
}

/// Remote API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API (default: "https://api.trello.com/1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Key/token pair sent with every request
    #[serde(default)]
    pub credentials: ApiCredentials,

    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials: ApiCredentials::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for an export run
///
/// Fields are organized into sub-configs:
/// - [`export`](ExportConfig): output tree, card selection, concurrency
/// - [`api`](ApiConfig): base URL, credentials, timeouts
/// - [`retry`](RetryConfig): backoff policy for transient remote failures
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Boards to export, in order
    #[serde(default)]
    pub board_ids: Vec<String>,

    /// Export behavior
    #[serde(default)]
    pub export: ExportConfig,

    /// Remote API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Storage root directory
    pub fn storage_dir(&self) -> &PathBuf {
        &self.export.storage_dir
    }

    /// Check the configuration for settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.board_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(Error::config("board_ids", "no board IDs provided"));
        }
        self.validate_export()?;
        if !self.api.credentials.is_complete() {
            return Err(Error::config(
                "credentials",
                "API key and token are required",
            ));
        }
        Ok(())
    }

    /// Check only the export section (storage root, concurrency, filters)
    pub fn validate_export(&self) -> Result<()> {
        if self.export.storage_dir.as_os_str().is_empty() {
            return Err(Error::config("storage_dir", "no storage path provided"));
        }
        if self.export.concurrency == 0 {
            return Err(Error::config("concurrency", "must be at least 1"));
        }
        if self.export.label_filter.is_some() && self.export.include_archived {
            return Err(Error::config(
                "label_filter",
                "label search only returns open cards; cannot combine with include_archived",
            ));
        }
        Ok(())
    }
}

/// Read board IDs, one per non-empty line, falling back to a single flag value
///
/// Mirrors piping IDs on stdin: lines win when present, otherwise `fallback` is used.
pub fn read_board_ids<R: BufRead>(reader: R, fallback: Option<&str>) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            ids.push(trimmed.to_string());
        }
    }

    if ids.is_empty() {
        match fallback.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => ids.push(id.to_string()),
            None => {
                return Err(Error::config(
                    "board_ids",
                    "no board IDs provided (pipe them in or pass one explicitly)",
                ));
            }
        }
    }

    Ok(ids)
}

// Default value functions
fn default_concurrency() -> usize {
    5
}

fn default_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
