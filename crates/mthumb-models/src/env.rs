//! Environment variable parsing for the config loaders.
//!
//! An unset or blank variable means "use the default". A variable that is set
//! but does not parse is a configuration error, never a silent default.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Raw value of `key`, or `None` when unset or blank.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `key` if it is set.
pub fn env_parse<T>(key: &str) -> ModelResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ModelError::config(format!("{key}='{raw}' is invalid: {e}")))
        })
        .transpose()
}

/// Parse a boolean flag: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`.
pub fn env_flag(key: &str) -> ModelResult<Option<bool>> {
    env_var(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ModelError::config(format!(
                "{key}='{raw}' is not a boolean"
            ))),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_blank_are_absent() {
        std::env::remove_var("MTHUMB_ENV_TEST_UNSET");
        assert_eq!(env_parse::<u32>("MTHUMB_ENV_TEST_UNSET").unwrap(), None);

        std::env::set_var("MTHUMB_ENV_TEST_BLANK", "  ");
        assert_eq!(env_parse::<u32>("MTHUMB_ENV_TEST_BLANK").unwrap(), None);
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        std::env::set_var("MTHUMB_ENV_TEST_BAD", "fifteen");
        let err = env_parse::<f64>("MTHUMB_ENV_TEST_BAD").unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
        assert!(err.to_string().contains("MTHUMB_ENV_TEST_BAD='fifteen'"));
    }

    #[test]
    fn test_flag_values() {
        std::env::set_var("MTHUMB_ENV_TEST_FLAG_ON", "Yes");
        assert_eq!(env_flag("MTHUMB_ENV_TEST_FLAG_ON").unwrap(), Some(true));
        std::env::set_var("MTHUMB_ENV_TEST_FLAG_OFF", "0");
        assert_eq!(env_flag("MTHUMB_ENV_TEST_FLAG_OFF").unwrap(), Some(false));
        std::env::set_var("MTHUMB_ENV_TEST_FLAG_BAD", "maybe");
        assert!(env_flag("MTHUMB_ENV_TEST_FLAG_BAD").is_err());
    }
}
