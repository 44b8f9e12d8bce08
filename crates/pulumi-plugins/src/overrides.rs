//! Plugin download URL overrides
//!
//! The override configuration is a single string of comma-separated
//! `pattern=URL` pairs, e.g. `^foo.*=https://foo,^bar.*=https://bar`. Plugin
//! names matching a pattern download from the mapped URL instead of the
//! default source chain. The table is process-wide immutable state, populated
//! once at startup and never mutated.

use once_cell::sync::Lazy;
use regex::Regex;

use pulumi_core::{Error, Result};

/// A single parsed override: a name pattern and the URL it maps to
#[derive(Debug)]
struct DownloadUrlOverride {
    pattern: Regex,
    url: String,
}

/// An ordered set of download URL overrides
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: Vec<DownloadUrlOverride>,
}

impl OverrideTable {
    /// Parse an override string with the expected format
    /// `regexp1=URL1,regexp2=URL2`. An empty string parses to an empty table.
    pub fn parse(overrides: &str) -> Result<Self> {
        let mut entries = Vec::new();
        if overrides.is_empty() {
            return Ok(Self { entries });
        }
        for pair in overrides.split(',') {
            let split: Vec<&str> = pair.split('=').collect();
            if split.len() != 2 || split[0].is_empty() || split[1].is_empty() {
                return Err(Error::InvalidOverride(overrides.to_string()));
            }
            entries.push(DownloadUrlOverride {
                pattern: Regex::new(split[0])?,
                url: split[1].to_string(),
            });
        }
        Ok(Self { entries })
    }

    /// Returns the URL of the first pattern matching `name`, in input order.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.is_match(name))
            .map(|entry| entry.url.as_str())
    }

    /// Number of parsed overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no overrides are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for OverrideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}={}", entry.pattern, entry.url))
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

// The override string is injected at build time so distributors can redirect
// plugin downloads without a code change. A malformed value aborts process
// initialization.
static DOWNLOAD_URL_OVERRIDES: Lazy<OverrideTable> = Lazy::new(|| {
    let raw = option_env!("PULUMI_PLUGIN_DOWNLOAD_URL_OVERRIDES").unwrap_or("");
    OverrideTable::parse(raw).expect("error parsing plugin download URL overrides")
});

/// The process-wide override table
pub(crate) fn download_url_overrides() -> &'static OverrideTable {
    &DOWNLOAD_URL_OVERRIDES
}
