//! Error types for pulumi-core

use semver::Version;
use thiserror::Error;

/// Result type alias using pulumi-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the plugin subsystem
#[derive(Error, Debug)]
pub enum Error {
    /// A plugin could not be located in the workspace
    #[error("{}", missing_plugin_message(.kind, .name, .version, .include_ambient))]
    MissingPlugin {
        kind: String,
        name: String,
        version: Option<Version>,
        include_ambient: bool,
    },

    /// The host operating system has no release artifacts
    #[error("unsupported plugin OS: {0}")]
    UnsupportedOs(String),

    /// The host architecture has no release artifacts
    #[error("unsupported plugin architecture: {0}")]
    UnsupportedArch(String),

    /// Malformed plugin download URL override configuration
    #[error("expected format to be \"regexp1=URL1,regexp2=URL2\"; got \"{0}\"")]
    InvalidOverride(String),

    /// An override pattern failed to compile
    #[error("invalid override pattern: {0}")]
    InvalidOverridePattern(#[from] regex::Error),

    /// The server answered with a non-success status
    #[error("{status} HTTP error fetching plugin from {url}{hint}")]
    Download {
        status: u16,
        url: String,
        hint: &'static str,
    },

    /// HTTP transport failure after retries were exhausted
    #[error("transport error fetching plugin: {0}")]
    Http(#[from] reqwest::Error),

    /// The release metadata did not list the requested artifact
    #[error("plugin asset '{0}' not found")]
    AssetNotFound(String),

    /// Latest-version discovery is not available for this source
    #[error("GetLatestVersion is not supported for {0}")]
    LatestVersionNotSupported(&'static str),

    /// Every release host in the fallback chain failed a latest-version lookup
    #[error("error getting version from Pulumi github: {public}\nand from private github: {private}")]
    LatestVersionFallback { public: Box<Error>, private: Box<Error> },

    /// A source's environment prerequisites are missing
    #[error("{0}")]
    SourceConfig(String),

    /// No installed plugin satisfies the requested version range
    #[error("failed to locate compatible plugin")]
    NoCompatiblePlugin,

    /// A version string could not be parsed, even tolerantly
    #[error("invalid plugin semver: {0}")]
    InvalidVersion(String),

    /// A plugin kind outside the closed set was supplied
    #[error("invalid plugin kind: {0}")]
    InvalidPluginKind(String),

    /// A download was requested for a plugin without a version
    #[error("unknown version for plugin {0}")]
    UnknownVersion(String),

    /// Lock acquisition, mkdir, extraction, or removal failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The user config root could not be determined
    #[error("could not determine user home directory")]
    NoHomeDir,

    /// A runtime dependency bootstrap child process failed
    #[error("installing {runtime} plugin dependencies failed:\n{output}")]
    DependencyInstall { runtime: &'static str, output: String },
}

impl Error {
    /// Create a missing-plugin error
    pub fn missing_plugin(
        kind: impl Into<String>,
        name: impl Into<String>,
        version: Option<Version>,
        include_ambient: bool,
    ) -> Self {
        Self::MissingPlugin {
            kind: kind.into(),
            name: name.into(),
            version,
            include_ambient,
        }
    }

    /// Create a source-config error
    pub fn source_config(message: impl Into<String>) -> Self {
        Self::SourceConfig(message.into())
    }
}

fn missing_plugin_message(
    kind: &str,
    name: &str,
    version: &Option<Version>,
    include_ambient: &bool,
) -> String {
    let include_path = if *include_ambient { " or on your $PATH" } else { "" };
    match version {
        Some(version) => format!(
            "no {kind} plugin 'pulumi-{kind}-{name}' found in the workspace at version \
             v{version}{include_path}, install the plugin using `pulumi plugin install \
             {kind} {name} v{version}`"
        ),
        None => format!(
            "no {kind} plugin 'pulumi-{kind}-{name}' found in the workspace{include_path}, \
             install the plugin using `pulumi plugin install {kind} {name}`"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_plugin_message_with_version() {
        let err = Error::missing_plugin("resource", "aws", Some(Version::new(1, 2, 3)), true);
        let message = err.to_string();
        assert!(message.contains("no resource plugin 'pulumi-resource-aws' found"));
        assert!(message.contains("at version v1.2.3"));
        assert!(message.contains("or on your $PATH"));
        assert!(message.contains("`pulumi plugin install resource aws v1.2.3`"));
    }

    #[test]
    fn test_missing_plugin_message_without_version() {
        let err = Error::missing_plugin("language", "nodejs", None, false);
        let message = err.to_string();
        assert!(message.contains("no language plugin 'pulumi-language-nodejs' found"));
        assert!(!message.contains("$PATH"));
        assert!(message.ends_with("`pulumi plugin install language nodejs`"));
    }
}
