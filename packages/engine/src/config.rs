//! Engine configuration.

use std::time::Duration;

use thiserror::Error;

use crate::cas::CasPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings shared by every job the engine constructs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub cas: CasPolicy,
}

impl EngineConfig {
    /// Build a config from the environment.
    ///
    /// `JOB_CAS_MAX_ATTEMPTS` and `JOB_CAS_BACKOFF_MS` override the retry
    /// defaults when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cas = CasPolicy::default();

        if let Some(attempts) = parse_var::<u32>("JOB_CAS_MAX_ATTEMPTS")? {
            cas = cas.with_max_attempts(attempts);
        }
        if let Some(ms) = parse_var::<u64>("JOB_CAS_BACKOFF_MS")? {
            cas = cas.with_initial_backoff(Duration::from_millis(ms));
        }

        Ok(Self { cas })
    }

    /// Set the conflict retry policy.
    pub fn with_cas_policy(mut self, cas: CasPolicy) -> Self {
        self.cas = cas;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::InvalidValue {
            key,
            value: value.clone(),
        }),
    }
}
