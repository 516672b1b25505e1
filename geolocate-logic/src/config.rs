use serde::{Deserialize, Serialize};

use crate::{error::ErrorMessages, location::PositionOptions, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for a [crate::LocationProvider], fixed once the provider is created
pub struct ProviderConfig {
    /// Ask the source for a more precise fix
    pub enable_high_accuracy: bool,
    /// How old (in milliseconds) a cached fix may be
    pub maximum_age_ms: u64,
    /// Milliseconds before the source should give up with a timeout
    pub timeout_ms: u64,
    /// Keep watching the position instead of asking once
    pub watch: bool,
    /// Messages shown for error codes 1 to 3
    pub error_messages: ErrorMessages,
}

impl ProviderConfig {
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: self.enable_high_accuracy,
            maximum_age_ms: self.maximum_age_ms,
            timeout_ms: self.timeout_ms,
        }
    }

    /// Parse a config from JSON, fields that are left out keep their defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse provider config")
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            maximum_age_ms: 0,
            timeout_ms: 5000,
            watch: true,
            error_messages: ErrorMessages::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config = ProviderConfig::from_json(r#"{ "watch": false, "timeout_ms": 250 }"#)
            .expect("Failed to parse");
        assert!(!config.watch);
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.maximum_age_ms, 0);
        assert!(!config.enable_high_accuracy);
        assert_eq!(config.error_messages, ErrorMessages::default());
    }

    #[test]
    fn test_bad_messages() {
        let res = ProviderConfig::from_json(r#"{ "error_messages": ["only one"] }"#);
        assert!(res.is_err(), "A short message table should be rejected");
    }

    #[test]
    fn test_options_forwarded() {
        let config = ProviderConfig {
            enable_high_accuracy: true,
            maximum_age_ms: 2000,
            timeout_ms: 10000,
            ..Default::default()
        };
        assert_eq!(
            config.position_options(),
            PositionOptions {
                enable_high_accuracy: true,
                maximum_age_ms: 2000,
                timeout_ms: 10000,
            }
        );
    }
}
