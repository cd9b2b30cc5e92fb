//! Runtime configuration, loaded from a TOML file with `FACESYNC_*`
//! environment overrides.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required configuration field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// ERPNext API credentials.
#[derive(Clone)]
pub struct ServiceAccount {
    pub api_key: String,
    pub api_secret: String,
}

impl ServiceAccount {
    /// Value of the `Authorization` header: `token <key>:<secret>`.
    pub fn auth_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Which gallery matcher to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Euclidean,
    Cosine,
}

/// Camera identifier; either a device index or a name/path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CameraId {
    Index(u32),
    Name(String),
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::Index(i) => write!(f, "{i}"),
            CameraId::Name(n) => f.write_str(n),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_account: ServiceAccount,
    /// ERPNext base URL, without trailing slash.
    pub erp_url: String,
    pub camera_id: CameraId,
    /// Minimum spacing between accepted detections of the same employee.
    pub check_interval: Duration,
    /// Bound on every remote request.
    pub request_timeout: Duration,
    /// Time after shift end before a present employee is closed out.
    pub grace_period: Duration,
    pub cache_path: PathBuf,
    /// Directory of `<EMPLOYEE_CODE>.json` reference embeddings.
    pub gallery_dir: PathBuf,
    /// Frame feed: a file/FIFO path, or `-` for stdin.
    pub feed: String,
    pub matcher: MatcherKind,
    /// Euclidean tolerance, or cosine threshold, depending on `matcher`.
    pub match_tolerance: f32,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServiceAccount {
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    service_account: Option<RawServiceAccount>,
    erp_url: Option<String>,
    camera_id: Option<CameraId>,
    check_interval_seconds: Option<u64>,
    request_timeout_secs: Option<u64>,
    grace_period_minutes: Option<u64>,
    cache_path: Option<PathBuf>,
    gallery_dir: Option<PathBuf>,
    feed: Option<String>,
    matcher: Option<MatcherKind>,
    match_tolerance: Option<f32>,
    log_file: Option<PathBuf>,
}

impl Config {
    /// Read `path`, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_with(&text, |key| std::env::var(key).ok())
    }

    /// Parse TOML text without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(text, |_| None)
    }

    fn from_toml_with(text: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut raw: RawConfig = toml::from_str(text)?;

        let account = raw.service_account.get_or_insert_with(RawServiceAccount::default);
        if let Some(v) = env("FACESYNC_API_KEY") {
            account.api_key = Some(v);
        }
        if let Some(v) = env("FACESYNC_API_SECRET") {
            account.api_secret = Some(v);
        }
        if let Some(v) = env("FACESYNC_ERP_URL") {
            raw.erp_url = Some(v);
        }
        if let Some(v) = env("FACESYNC_CAMERA_ID") {
            raw.camera_id = Some(match v.parse::<u32>() {
                Ok(i) => CameraId::Index(i),
                Err(_) => CameraId::Name(v),
            });
        }

        raw.validate()
    }
}

impl RawConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        let account = self.service_account.unwrap_or_default();
        let api_key = non_empty(account.api_key).ok_or(ConfigError::MissingField("service_account.api_key"))?;
        let api_secret =
            non_empty(account.api_secret).ok_or(ConfigError::MissingField("service_account.api_secret"))?;
        let erp_url = non_empty(self.erp_url).ok_or(ConfigError::MissingField("erp_url"))?;
        if !(erp_url.starts_with("http://") || erp_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "erp_url",
                reason: format!("{erp_url} is not an http(s) URL"),
            });
        }

        let matcher = self.matcher.unwrap_or(MatcherKind::Euclidean);
        let match_tolerance = self.match_tolerance.unwrap_or(match matcher {
            MatcherKind::Euclidean => 0.6,
            MatcherKind::Cosine => 0.4,
        });
        if !match_tolerance.is_finite() {
            return Err(ConfigError::Invalid {
                field: "match_tolerance",
                reason: "must be a finite number".into(),
            });
        }

        let request_timeout_secs = self.request_timeout_secs.unwrap_or(10);
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }

        let grace_period_secs = self
            .grace_period_minutes
            .unwrap_or(120)
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid {
                field: "grace_period_minutes",
                reason: "too large".into(),
            })?;

        Ok(Config {
            service_account: ServiceAccount { api_key, api_secret },
            erp_url: erp_url.trim_end_matches('/').to_string(),
            camera_id: self.camera_id.unwrap_or(CameraId::Index(0)),
            check_interval: Duration::from_secs(self.check_interval_seconds.unwrap_or(5)),
            request_timeout: Duration::from_secs(request_timeout_secs),
            grace_period: Duration::from_secs(grace_period_secs),
            cache_path: self
                .cache_path
                .unwrap_or_else(|| PathBuf::from("attendance_cache.json")),
            gallery_dir: self.gallery_dir.unwrap_or_else(|| PathBuf::from("faces")),
            feed: self.feed.unwrap_or_else(|| "-".to_string()),
            matcher,
            match_tolerance,
            log_file: self.log_file,
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}
