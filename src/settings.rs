//! Registry configuration.

use serde::Serialize;

use crate::{ContextMapConfig, Error, Level, Result};

/// Prefix of the environment variables read by [`Settings::from_env`].
pub const ENV_PREFIX: &str = "CAPTURING_LOGGER_";

const OFF: &str = "OFF";

/// Configuration of a [`LoggerRegistry`](crate::LoggerRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Lowest level captured by loggers without an explicit level override.
    pub capture_level: Level,
    /// Lowest level echoed to the console, or `None` to keep quiet.
    pub print_level: Option<Level>,
    pub context_map: ContextMapConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture_level: Level::Trace,
            print_level: None,
            context_map: ContextMapConfig::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `CAPTURING_LOGGER_*` environment variables.
    ///
    /// | Variable | Values |
    /// |----------|--------|
    /// | `CAPTURING_LOGGER_CAPTURE_LEVEL` | a level name |
    /// | `CAPTURING_LOGGER_PRINT_LEVEL` | a level name or `OFF` |
    /// | `CAPTURING_LOGGER_MDC_INHERIT` | `true` / `false` |
    /// | `CAPTURING_LOGGER_MDC_ALLOW_NULL_VALUES` | `true` / `false` |
    /// | `CAPTURING_LOGGER_MDC_NULL_SNAPSHOT_WHEN_UNSET` | `true` / `false` |
    /// | `CAPTURING_LOGGER_MDC_ENABLED` | `true` / `false` |
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if a variable holds an unknown level or a
    /// non-boolean flag.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Reads settings through `lookup`, which receives keys without the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if a key holds an unknown level or a
    /// non-boolean flag.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key).map_or(Ok(default), |value| parse_flag(key, &value))
        };

        let capture_level = match lookup("CAPTURE_LEVEL") {
            Some(value) => parse_level("CAPTURE_LEVEL", &value)?,
            None => defaults.capture_level,
        };
        let print_level = match lookup("PRINT_LEVEL") {
            Some(value) if value.trim().eq_ignore_ascii_case(OFF) => None,
            Some(value) => Some(parse_level("PRINT_LEVEL", &value)?),
            None => defaults.print_level,
        };
        let mdc = defaults.context_map;
        let context_map = ContextMapConfig {
            inherit_across_fork: flag("MDC_INHERIT", mdc.inherit_across_fork)?,
            allow_null_values: flag("MDC_ALLOW_NULL_VALUES", mdc.allow_null_values)?,
            return_null_snapshot_when_unset: flag(
                "MDC_NULL_SNAPSHOT_WHEN_UNSET",
                mdc.return_null_snapshot_when_unset,
            )?,
            enabled: flag("MDC_ENABLED", mdc.enabled)?,
        };

        Ok(Self {
            capture_level,
            print_level,
            context_map,
        })
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Error {
    Error::InvalidSetting {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_owned(),
        reason: reason.into(),
    }
}

fn parse_level(key: &str, value: &str) -> Result<Level> {
    value
        .parse()
        .map_err(|err: Error| invalid(key, value, err.to_string()))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "expected `true` or `false`")),
    }
}
