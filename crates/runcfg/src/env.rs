//! Environment variable resolution.
//!
//! Every lookup in this crate goes through one of two flavours:
//! - [`first_env`] reads the live process environment
//! - [`first_var`] reads a `HashMap` snapshot (used by the `from_vars`
//!   loaders and by tests, which must not mutate the process environment)
//!
//! Both return the value of the first name whose variable is set to a
//! non-empty string. Absence is a normal result, reported as an empty string.

use crate::error::RuncfgError;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Returns the first non-empty value among `names` in the process
/// environment, or an empty string if none is set.
#[must_use]
pub fn first_env<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .find_map(|name| env::var(name.as_ref()).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

/// Returns the first non-empty value among `names` in `vars`, or an empty
/// string if none is set.
#[must_use]
pub fn first_var<S: AsRef<str>>(vars: &HashMap<String, String>, names: &[S]) -> String {
    names
        .iter()
        .find_map(|name| vars.get(name.as_ref()).filter(|v| !v.is_empty()).cloned())
        .unwrap_or_default()
}

/// Snapshot of the current process environment.
///
/// Non-UTF-8 variables are skipped.
#[must_use]
pub fn snapshot() -> HashMap<String, String> {
    env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Value of `name` in `vars` if non-empty, else `default`.
pub(crate) fn var_or(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name)
        .filter(|v| !v.is_empty())
        .map_or_else(|| default.to_string(), Clone::clone)
}

/// Parses the unsigned decimal variable `name` from `vars`.
///
/// Unset and empty variables yield `Ok(None)`. Anything other than ASCII
/// digits (signs and whitespace included) or a value out of range for `T`
/// is an `EnvironmentProcess` error naming the variable.
pub(crate) fn parse_var<T>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, RuncfgError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = vars.get(name).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let invalid = |reason: String| RuncfgError::EnvironmentProcess {
        var: name.to_string(),
        value: raw.clone(),
        reason,
    };

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not an unsigned decimal integer".to_string()));
    }

    raw.parse()
        .map(Some)
        .map_err(|e: T::Err| invalid(e.to_string()))
}
