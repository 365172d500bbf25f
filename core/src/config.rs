//! Settings for the default transport and session runtime.
//!
//! # Design
//! Everything here is handed to the underlying HTTP client as-is; the
//! executor adds no timeout or retry policy of its own. Values come from
//! `COURIER_*` environment variables or any serde source.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const ENV_TIMEOUT_SECS: &str = "COURIER_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "COURIER_CONNECT_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "COURIER_USER_AGENT";
pub const ENV_WORKER_THREADS: &str = "COURIER_WORKER_THREADS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-exchange timeout. `None` leaves the client default (no limit).
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Workers for a session-owned runtime. Ignored when the session runs
    /// on an existing runtime.
    pub worker_threads: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            connect_timeout_secs: None,
            user_agent: concat!("courier/", env!("CARGO_PKG_VERSION")).to_string(),
            worker_threads: 2,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = Some(parse_var(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            config.connect_timeout_secs = Some(parse_var(ENV_CONNECT_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_USER_AGENT) {
            config.user_agent = raw;
        }
        if let Some(raw) = lookup(ENV_WORKER_THREADS) {
            let workers: usize = parse_var(ENV_WORKER_THREADS, &raw)?;
            if workers == 0 {
                return Err(ApiError::Config(format!("{ENV_WORKER_THREADS} must be at least 1")));
            }
            config.worker_threads = workers;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ApiError::Config(format!("{name}={raw:?}: {e}")))
}
