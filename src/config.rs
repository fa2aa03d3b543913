//! Request configuration, defaults and clamp ranges.
//!
//! Every numeric field is clamped into its declared range when it is set,
//! so a [`RequestConfig`] never carries an out-of-range value.

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

use tracing::warn;

use crate::prompt::DEFAULT_RULES;

/// Model used when the caller leaves the model name blank.
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3.2";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RETRIES: u32 = 3;

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<i64> = 64..=8192;
pub const CONNECT_TIMEOUT_RANGE: RangeInclusive<i64> = 2..=120;
pub const READ_TIMEOUT_RANGE: RangeInclusive<i64> = 5..=300;
pub const RETRIES_RANGE: RangeInclusive<i64> = 0..=10;

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV_VAR: &str = "PROMPTMERGE_API_KEY";

/// Environment variable to override the default retry count.
pub const RETRIES_ENV_VAR: &str = "PROMPTMERGE_RETRIES";

fn clamp_int(value: i64, range: &RangeInclusive<i64>) -> i64 {
    value.clamp(*range.start(), *range.end())
}

fn clamp_temperature(value: f32) -> f32 {
    if value.is_nan() {
        return DEFAULT_TEMPERATURE;
    }
    value.clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end())
}

/// Read the API key from the environment, ignoring empty values.
pub fn api_key_from_env() -> Option<String> {
    match env::var(API_KEY_ENV_VAR) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Get the default retry count.
///
/// Reads from PROMPTMERGE_RETRIES if set, otherwise uses 3. Logs a warning
/// if the variable holds something that is not an integer.
fn default_retries() -> u32 {
    match env::var(RETRIES_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.trim().parse::<i64>() {
            Ok(n) => clamp_int(n, &RETRIES_RANGE) as u32,
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}",
                    RETRIES_ENV_VAR, v, DEFAULT_RETRIES
                );
                DEFAULT_RETRIES
            }
        },
        _ => DEFAULT_RETRIES,
    }
}

/// Rule document and sampling defaults for one merge node flavour.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeDefaults {
    pub rules: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retries: u32,
}

impl Default for MergeDefaults {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl MergeDefaults {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            retries: default_retries(),
            ..Default::default()
        }
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = clamp_int(max_tokens, &MAX_TOKENS_RANGE) as u32;
        self
    }
}

/// Connect timeout and per-read timeout for the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

/// Everything needed to issue one merge request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    api_key: String,
    model: String,
    rules: String,
    temperature: f32,
    max_tokens: u32,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
    retries: u32,
}

impl RequestConfig {
    /// Create a config with the built-in defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_defaults(api_key, &MergeDefaults::default())
    }

    /// Create a config seeded from the given defaults.
    pub fn from_defaults(api_key: impl Into<String>, defaults: &MergeDefaults) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            rules: defaults.rules.trim().to_string(),
            temperature: clamp_temperature(defaults.temperature),
            max_tokens: clamp_int(i64::from(defaults.max_tokens), &MAX_TOKENS_RANGE) as u32,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            retries: clamp_int(i64::from(defaults.retries), &RETRIES_RANGE) as u32,
        }
        .with_model(defaults.model.clone())
    }

    /// Set the model. A blank name falls back to [`DEFAULT_MODEL`].
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = model.trim();
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };
        self
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into().trim().to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = clamp_int(max_tokens, &MAX_TOKENS_RANGE) as u32;
        self
    }

    pub fn with_connect_timeout(mut self, secs: i64) -> Self {
        self.connect_timeout_secs = clamp_int(secs, &CONNECT_TIMEOUT_RANGE) as u64;
        self
    }

    pub fn with_read_timeout(mut self, secs: i64) -> Self {
        self.read_timeout_secs = clamp_int(secs, &READ_TIMEOUT_RANGE) as u64;
        self
    }

    pub fn with_retries(mut self, retries: i64) -> Self {
        self.retries = clamp_int(retries, &RETRIES_RANGE) as u32;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn rules(&self) -> &str {
        &self.rules
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }
}
