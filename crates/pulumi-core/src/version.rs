//! Tolerant semantic version parsing
//!
//! Plugin versions arrive from directory names, release tags, and user input,
//! which frequently carry a leading `v` or omit the minor/patch components.

use semver::Version;

use crate::error::{Error, Result};

/// Parse a version string, tolerating a leading `v` and missing components.
///
/// `v1.2.3`, `1.2`, and `1` all parse; the missing components are filled with
/// zero. Short forms carrying pre-release or build metadata (e.g. `1.2-beta`)
/// are ambiguous and stay rejected.
pub fn parse_tolerant(value: &str) -> Result<Version> {
    let trimmed = value.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(stripped) {
        return Ok(version);
    }

    let core_len = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, meta) = stripped.split_at(core_len);
    if meta.is_empty() && !core.is_empty() {
        let dots = core.matches('.').count();
        if dots < 2 {
            let padded = format!("{}{}", core, ".0".repeat(2 - dots));
            if let Ok(version) = Version::parse(&padded) {
                return Ok(version);
            }
        }
    }

    Err(Error::InvalidVersion(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        assert_eq!(parse_tolerant("1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_leading_v() {
        assert_eq!(parse_tolerant("v1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_missing_components() {
        assert_eq!(parse_tolerant("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_tolerant("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_tolerant("v2").unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let version = parse_tolerant("v1.2.3-beta.1+abc").unwrap();
        assert_eq!(version.major, 1);
        assert_eq!(version.pre.as_str(), "beta.1");
        assert_eq!(version.build.as_str(), "abc");
    }

    #[test]
    fn test_parse_short_form_with_prerelease_rejected() {
        assert!(parse_tolerant("1.2-beta").is_err());
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(parse_tolerant("not-a-version").is_err());
        assert!(parse_tolerant("").is_err());
    }
}
