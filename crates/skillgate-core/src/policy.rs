//! Process-wide trust policy.
//!
//! Built once at startup and shared read-only between concurrent
//! authentications. Defaults carry the platform's pinned values; the
//! deployment supplies its own application identifier.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SKILLGATE_APPLICATION_ID` | Expected application identifier (required) |
//! | `SKILLGATE_TRUSTED_HOST` | Certificate host (default: `s3.amazonaws.com`) |
//! | `SKILLGATE_TRUSTED_PATH_PREFIX` | Certificate path prefix (default: `/echo.api/`) |
//! | `SKILLGATE_TRUSTED_SUBJECT` | Required subject alternative name (default: `echo-api.amazon.com`) |
//! | `SKILLGATE_MAX_REQUEST_AGE_SECS` | Replay window in seconds (default: 150) |
//! | `SKILLGATE_ALLOW_DEV_BYPASS` | Honour the `_dev` query parameter (dev only) |
//! | `SKILLGATE_CERT_CACHE_TTL_SECS` | Enable the certificate cache with this TTL |
//! | `SKILLGATE_FETCH_TIMEOUT_SECS` | Certificate fetch timeout (default: 5) |

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_TRUSTED_HOST: &str = "s3.amazonaws.com";
pub const DEFAULT_TRUSTED_PATH_PREFIX: &str = "/echo.api/";
pub const DEFAULT_TRUSTED_SUBJECT: &str = "echo-api.amazon.com";
pub const DEFAULT_MAX_REQUEST_AGE: Duration = Duration::from_secs(150);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Certificate chains are a few KiB; anything larger is not a certificate.
pub const DEFAULT_MAX_CERT_BYTES: usize = 256 * 1024;
pub const DEFAULT_CERT_CACHE_ENTRIES: u64 = 16;

/// Query parameter that requests the development bypass.
pub const DEV_BYPASS_PARAM: &str = "_dev";

/// Certificate cache settings. Absent means fetch on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertCacheConfig {
    pub max_entries: u64,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPolicy {
    pub trusted_host: String,
    pub trusted_path_prefix: String,
    pub trusted_subject: String,
    pub application_id: String,
    pub max_request_age: Duration,
    /// Gate for the `_dev` query parameter. Off unless explicitly enabled.
    pub allow_dev_bypass: bool,
    pub cert_cache: Option<CertCacheConfig>,
    pub fetch_timeout: Duration,
    pub max_cert_bytes: usize,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            trusted_host: DEFAULT_TRUSTED_HOST.to_string(),
            trusted_path_prefix: DEFAULT_TRUSTED_PATH_PREFIX.to_string(),
            trusted_subject: DEFAULT_TRUSTED_SUBJECT.to_string(),
            application_id: String::new(),
            max_request_age: DEFAULT_MAX_REQUEST_AGE,
            allow_dev_bypass: false,
            cert_cache: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_cert_bytes: DEFAULT_MAX_CERT_BYTES,
        }
    }
}

impl AuthPolicy {
    /// Platform defaults for the given application.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            ..Self::default()
        }
    }

    /// Load from `SKILLGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup. Unset variables keep their
    /// defaults; set but unparseable ones are errors.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();

        if let Some(v) = lookup("SKILLGATE_APPLICATION_ID") {
            policy.application_id = v.trim().to_string();
        }
        if let Some(v) = lookup("SKILLGATE_TRUSTED_HOST") {
            policy.trusted_host = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = lookup("SKILLGATE_TRUSTED_PATH_PREFIX") {
            policy.trusted_path_prefix = v;
        }
        if let Some(v) = lookup("SKILLGATE_TRUSTED_SUBJECT") {
            policy.trusted_subject = v;
        }
        if let Some(v) = lookup("SKILLGATE_MAX_REQUEST_AGE_SECS") {
            policy.max_request_age = parse_secs("SKILLGATE_MAX_REQUEST_AGE_SECS", &v)?;
        }
        if let Some(v) = lookup("SKILLGATE_ALLOW_DEV_BYPASS") {
            policy.allow_dev_bypass = parse_flag("SKILLGATE_ALLOW_DEV_BYPASS", &v)?;
        }
        if let Some(v) = lookup("SKILLGATE_CERT_CACHE_TTL_SECS") {
            let ttl = parse_secs("SKILLGATE_CERT_CACHE_TTL_SECS", &v)?;
            policy.cert_cache = (!ttl.is_zero()).then_some(CertCacheConfig {
                max_entries: DEFAULT_CERT_CACHE_ENTRIES,
                ttl,
            });
        }
        if let Some(v) = lookup("SKILLGATE_FETCH_TIMEOUT_SECS") {
            policy.fetch_timeout = parse_secs("SKILLGATE_FETCH_TIMEOUT_SECS", &v)?;
        }

        Ok(policy)
    }

    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = application_id.into();
        self
    }

    pub fn with_max_request_age(mut self, age: Duration) -> Self {
        self.max_request_age = age;
        self
    }

    /// Allow the `_dev` query parameter to skip verification (dev only).
    pub fn with_dev_bypass(mut self, allow: bool) -> Self {
        self.allow_dev_bypass = allow;
        self
    }

    pub fn with_cert_cache(mut self, ttl: Duration) -> Self {
        self.cert_cache = Some(CertCacheConfig {
            max_entries: DEFAULT_CERT_CACHE_ENTRIES,
            ttl,
        });
        self
    }

    /// Reject settings that would make every request fail or pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_id.is_empty() {
            return Err(ConfigError::Missing("SKILLGATE_APPLICATION_ID"));
        }
        if self.max_request_age.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "max_request_age",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.trusted_host.is_empty() {
            return Err(ConfigError::Missing("SKILLGATE_TRUSTED_HOST"));
        }
        if !self.trusted_path_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                name: "trusted_path_prefix",
                value: self.trusted_path_prefix.clone(),
                reason: "must be an absolute path".to_string(),
            });
        }
        if self.trusted_subject.is_empty() {
            return Err(ConfigError::Missing("SKILLGATE_TRUSTED_SUBJECT"));
        }
        Ok(())
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
