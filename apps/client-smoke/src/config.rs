//! Environment-backed configuration for the smoke binary.
//!
//! Lookup is injected so tests never touch the process environment.

use client_core::{ClientTuning, LocalIdentity};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required configuration key {key}")]
    MissingValue { key: &'static str },
    #[error("invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmokeConfig {
    pub server_url: String,
    pub identity: LocalIdentity,
    pub tuning: ClientTuning,
    /// Image staged as a draft attachment during the run, when set.
    pub image_path: Option<String>,
}

impl SmokeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = lookup("EMBER_SERVER_URL").ok_or(ConfigError::MissingValue {
            key: "EMBER_SERVER_URL",
        })?;
        let user_id = match lookup("EMBER_USER_ID") {
            Some(raw) => parse_u64("EMBER_USER_ID", &raw)?,
            None => {
                return Err(ConfigError::MissingValue {
                    key: "EMBER_USER_ID",
                });
            }
        };
        let identity = LocalIdentity {
            user_id,
            username: lookup("EMBER_USERNAME").unwrap_or_else(|| "smoke".to_owned()),
            color: lookup("EMBER_COLOR").unwrap_or_else(|| "#8be9fd".to_owned()),
        };

        let mut tuning = ClientTuning::default();
        override_u64(&lookup, "EMBER_SEND_COOLDOWN_MS", &mut tuning.send_cooldown_ms)?;
        override_u64(&lookup, "EMBER_TYPING_IDLE_MS", &mut tuning.typing_idle_ms)?;
        override_u64(&lookup, "EMBER_NOTICE_TTL_MS", &mut tuning.notice_ttl_ms)?;
        if let Some(raw) = lookup("EMBER_TIMELINE_MAX_ITEMS") {
            tuning.timeline_max_items = parse_usize("EMBER_TIMELINE_MAX_ITEMS", &raw)?;
        }

        Ok(Self {
            server_url,
            identity,
            tuning,
            image_path: lookup("EMBER_IMAGE_PATH"),
        })
    }
}

fn override_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    target: &mut u64,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *target = parse_u64(key, &raw)?;
    }
    Ok(())
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: err.to_string(),
        })
}

fn parse_usize(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: err.to_string(),
        })
}
