//! Board and API settings read from the environment.
//!
//! A missing board id is a normal state, not an error at load time: the
//! service checks `BoardConfig::board_id()` before every call and
//! short-circuits with `NotConfigured` instead of sending a malformed query.

use crate::client::{DEFAULT_API_URL, DEFAULT_API_VERSION};
use crate::error::ConfigError;

pub const BOARD_ID_VAR: &str = "MONDAY_BOARD_ID";
pub const API_TOKEN_VAR: &str = "MONDAY_API_TOKEN";
pub const API_URL_VAR: &str = "MONDAY_API_URL";
pub const API_VERSION_VAR: &str = "MONDAY_API_VERSION";

/// Placeholder shipped in sample env files; treated as unset.
const BOARD_ID_PLACEHOLDER: &str = "YOUR_BOARD_ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub board_id: Option<String>,
    pub api_token: Option<String>,
    pub api_url: String,
    pub api_version: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            board_id: None,
            api_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl BoardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let board_id = get(BOARD_ID_VAR).filter(|id| id != BOARD_ID_PLACEHOLDER);
        if let Some(id) = &board_id {
            if !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Invalid {
                    key: BOARD_ID_VAR,
                    reason: format!("{id:?} is not a numeric board id"),
                });
            }
        }

        let api_url = get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: API_URL_VAR,
                reason: format!("{api_url:?} is not an http(s) URL"),
            });
        }

        Ok(Self {
            board_id,
            api_token: get(API_TOKEN_VAR),
            api_url,
            api_version: get(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    pub fn with_board_id(mut self, board_id: impl Into<String>) -> Self {
        self.board_id = Some(board_id.into());
        self
    }

    pub fn board_id(&self) -> Result<&str, ConfigError> {
        self.board_id.as_deref().ok_or(ConfigError::NotConfigured)
    }
}
