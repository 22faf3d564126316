//! Module: config
//! Responsibility: engine-wide presentation and parsing settings.
//! Does not own: per-field classification (the collaborator provides it).
//! Boundary: validated once in `Engine::new`; bindings copy what they need.

use crate::{binning::BinningMode, error::InternalError};
use serde::Deserialize;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("event separator must not be empty")]
    EmptyEventSeparator,

    #[error("range separator must not be empty")]
    EmptyRangeSeparator,

    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::config_unsupported(err.to_string())
    }
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Separator of tags inside a composite event-set string.
    pub event_separator: String,

    /// Text placed between the start and end of a rendered range.
    pub range_separator: String,

    pub default_mode: BinningMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_separator: ";".to_string(),
            range_separator: " - ".to_string(),
            default_mode: BinningMode::Linear,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document; absent keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_separator.is_empty() {
            return Err(ConfigError::EmptyEventSeparator);
        }
        if self.range_separator.is_empty() {
            return Err(ConfigError::EmptyRangeSeparator);
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, ErrorOrigin};

    #[test]
    fn defaults_fill_missing_keys() {
        let config = EngineConfig::from_json(r#"{ "default_mode": "log" }"#).unwrap();

        assert_eq!(config.event_separator, ";");
        assert_eq!(config.range_separator, " - ");
        assert_eq!(config.default_mode, BinningMode::Log);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "separator": "," }"#).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_separators_fail_validation() {
        let err = EngineConfig::from_json(r#"{ "event_separator": "" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyEventSeparator));

        let err: InternalError = EngineConfig::from_json(r#"{ "range_separator": "" }"#)
            .unwrap_err()
            .into();
        assert_eq!(err.class, ErrorClass::Unsupported);
        assert_eq!(err.origin, ErrorOrigin::Config);
    }
}
