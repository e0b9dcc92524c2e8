//! Credentials and process-wide settings.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SEARCH_BASE: &str = "https://api.duckduckgo.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// A Gemini API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Resolves the key through `lookup`, treating blank values as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&'static str) -> Option<String>,
    {
        match lookup(API_KEY_VAR) {
            Some(key) if !key.trim().is_empty() => Ok(Self(key.trim().to_owned())),
            _ => Err(ConfigError::MissingCredential { var: API_KEY_VAR }),
        }
    }

    /// Reads the key from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// How long to wait for the remote side to finish processing an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl ReadinessPolicy {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self { interval, max_polls }
    }

    /// Upper bound on time spent sleeping between polls.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_polls)
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 600)
    }
}
