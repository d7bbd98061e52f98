//! Start request parsing
//!
//! Field names follow the web API: `interval` is also accepted as
//! `frequency`, and `age` as `timestamp`.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::location::{Mode, SessionConfig};

/// Arguments of `startLocation`; missing fields take the plugin defaults
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartLocationArgs {
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default, alias = "frequency")]
    pub interval: Option<u64>,
    #[serde(default, alias = "timestamp")]
    pub age: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl StartLocationArgs {
    /// Parse the `data` object of a start message; null means all defaults
    pub fn from_data(data: &Value) -> Result<Self> {
        if data.is_null() {
            return Ok(Self::default());
        }
        let args: Self = serde_json::from_value(data.clone())?;
        args.validate()?;
        Ok(args)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(accuracy) = self.accuracy {
            if !accuracy.is_finite() || accuracy <= 0.0 {
                return Err(serde_json::Error::custom(format!(
                    "accuracy must be a positive number, got {}",
                    accuracy
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn resolve(&self, defaults: &SessionConfig) -> SessionConfig {
        SessionConfig {
            mode: self.mode.unwrap_or(defaults.mode),
            accuracy_threshold: self.accuracy.unwrap_or(defaults.accuracy_threshold),
            update_interval_ms: self.interval.unwrap_or(defaults.update_interval_ms),
            max_age_ms: self.age.unwrap_or(defaults.max_age_ms),
            timeout_ms: self.timeout.unwrap_or(defaults.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocationError;
    use serde_json::json;

    #[test]
    fn test_full_request() {
        let args = StartLocationArgs::from_data(&json!({
            "mode": "all",
            "accuracy": 25.5,
            "interval": 1000,
            "age": 60000,
            "timeout": 5000
        }))
        .unwrap();

        let config = args.resolve(&SessionConfig::default());
        assert_eq!(
            config,
            SessionConfig {
                mode: Mode::All,
                accuracy_threshold: 25.5,
                update_interval_ms: 1000,
                max_age_ms: 60_000,
                timeout_ms: 5000,
            }
        );
    }

    #[test]
    fn test_aliases() {
        let args =
            StartLocationArgs::from_data(&json!({"frequency": 400, "timestamp": 30000})).unwrap();
        assert_eq!(args.interval, Some(400));
        assert_eq!(args.age, Some(30_000));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let defaults = SessionConfig {
            accuracy_threshold: 70.0,
            timeout_ms: 9_000,
            ..SessionConfig::default()
        };
        let config = StartLocationArgs::from_data(&Value::Null)
            .unwrap()
            .resolve(&defaults);
        assert_eq!(config, defaults);

        let config = StartLocationArgs::from_data(&json!({"mode": "filter"}))
            .unwrap()
            .resolve(&defaults);
        assert_eq!(config.mode, Mode::Filtered);
        assert_eq!(config.accuracy_threshold, 70.0);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let result = StartLocationArgs::from_data(&json!({"mode": "sometimes"}));
        assert!(matches!(result, Err(LocationError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_non_positive_accuracy() {
        let result = StartLocationArgs::from_data(&json!({"accuracy": 0}));
        assert!(matches!(result, Err(LocationError::InvalidRequest(_))));
        let result = StartLocationArgs::from_data(&json!({"accuracy": -5.0}));
        assert!(matches!(result, Err(LocationError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_negative_durations() {
        let result = StartLocationArgs::from_data(&json!({"timeout": -1}));
        assert!(matches!(result, Err(LocationError::InvalidRequest(_))));
    }
}
