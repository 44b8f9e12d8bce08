//! Shared utility functions for the plugin subsystem

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Get the Pulumi home directory, `~/.pulumi` by default.
///
/// `PULUMI_HOME` overrides the location outright. Otherwise the HOME
/// environment variable is preferred over `dirs::home_dir()` so container
/// setups that remap HOME stay consistent with shell scripts. Fails
/// explicitly when no home directory can be determined; callers never fall
/// back to the working directory.
pub fn pulumi_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PULUMI_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home).join(".pulumi"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".pulumi"))
        .ok_or(Error::NoHomeDir)
}

/// Interpret an environment variable value as a boolean opt-in.
pub fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("yes"));
    }

    #[test]
    fn test_pulumi_home_resolves() {
        // HOME is set in CI/test environments
        if std::env::var("HOME").is_ok() {
            let home = pulumi_home().unwrap();
            assert!(home.ends_with(".pulumi") || std::env::var("PULUMI_HOME").is_ok());
        }
    }
}
