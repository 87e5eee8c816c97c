//! Environment configuration helpers
//!
//! All klang configuration is environment-driven. These helpers resolve a
//! variable with a compiled default; values that do not parse fall back
//! to the default with a warning.

use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Read a string variable, falling back to `default` when unset or empty.
pub fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read an optional string variable (`None` when unset or empty).
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Read and parse a variable, falling back to `default` when unset or
/// unparseable. Logs a warning on parse failure.
pub fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Invalid value for {}: {:?}. Using default {}.",
                    name, raw, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
