//! Plugin identity, naming conventions, and cache path derivation
//!
//! Every plugin is identified by a kind, a name, and an optional semantic
//! version. Installed plugins live at
//! `<cache root>/<kind>-<name>-v<version>/` with the loadable executable
//! named `pulumi-<kind>-<name>` inside. Two sentinel files sit next to the
//! directory during installation: `<dir>.lock` (advisory install lock) and
//! `<dir>.partial` (install-in-progress marker).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use pulumi_core::{Error, Result};

/// Matches plugin directory names: `<kind>-<name>-v<version>`
pub(crate) static PLUGIN_DIR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(?P<kind>[a-z]+)-(?P<name>[a-zA-Z0-9-]*[a-zA-Z0-9])-v(?P<version>.*)$")
        .expect("plugin directory pattern")
});

/// Matches leftover temp directories from interrupted installs (`*.tmpNNN`)
pub(crate) static INSTALLING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.tmp[0-9]+$").expect("in-flight directory pattern"));

/// A kind of plugin that may be dynamically loaded and used by Pulumi
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// A resource analyzer
    Analyzer,
    /// A language host
    Language,
    /// A resource provider for custom CRUD operations
    Resource,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyzer => write!(f, "analyzer"),
            Self::Language => write!(f, "language"),
            Self::Resource => write!(f, "resource"),
        }
    }
}

impl FromStr for PluginKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "analyzer" => Ok(Self::Analyzer),
            "language" => Ok(Self::Language),
            "resource" => Ok(Self::Resource),
            other => Err(Error::InvalidPluginKind(other.to_string())),
        }
    }
}

/// Returns the directory in which plugins on the current machine are managed.
pub fn plugin_cache_dir() -> Result<PathBuf> {
    Ok(pulumi_core::pulumi_home()?.join("plugins"))
}

/// Basic information about a plugin.
///
/// This is a descriptive record; the on-disk cache owns the lifecycle. Values
/// are constructed from scan results, user requests, or parsed directory
/// names.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// The simple name of the plugin
    pub name: String,
    /// The kind of the plugin (language, resource, etc.)
    pub kind: PluginKind,
    /// The plugin's semantic version, if present
    pub version: Option<Version>,
    /// The path the plugin was loaded from
    pub path: PathBuf,
    /// The size of the plugin directory tree, in bytes
    pub size: u64,
    /// When the plugin was installed, if the platform records creation times
    pub install_time: Option<DateTime<Utc>>,
    /// When the plugin was last used
    pub last_used_time: Option<DateTime<Utc>>,
    /// An optional server to use when downloading this plugin
    pub plugin_download_url: Option<String>,
    /// If set, used as the cache root instead of the default
    pub plugin_dir: Option<PathBuf>,
}

impl PluginInfo {
    /// Create a plugin record from its identity
    pub fn new(kind: PluginKind, name: impl Into<String>, version: Option<Version>) -> Self {
        Self {
            name: name.into(),
            kind,
            version,
            path: PathBuf::new(),
            size: 0,
            install_time: None,
            last_used_time: None,
            plugin_download_url: None,
            plugin_dir: None,
        }
    }

    /// The expected cache directory name for this plugin
    pub fn dir_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}-{}-v{}", self.kind, self.name, version),
            None => format!("{}-{}", self.kind, self.name),
        }
    }

    /// The expected executable name, without any OS suffix
    pub fn file_prefix(&self) -> String {
        format!("pulumi-{}-{}", self.kind, self.name)
    }

    /// OS-specific executable suffix
    pub fn file_suffix(&self) -> &'static str {
        if cfg!(windows) {
            ".exe"
        } else {
            ""
        }
    }

    /// The expected executable filename for this plugin
    pub fn file_name(&self) -> String {
        format!("{}{}", self.file_prefix(), self.file_suffix())
    }

    /// The directory where this plugin should be installed
    pub fn dir_path(&self) -> Result<PathBuf> {
        let root = match &self.plugin_dir {
            Some(dir) => dir.clone(),
            None => plugin_cache_dir()?,
        };
        Ok(root.join(self.dir_name()))
    }

    /// Full path to the plugin's primary executable
    pub fn file_path(&self) -> Result<PathBuf> {
        Ok(self.dir_path()?.join(self.file_name()))
    }

    /// Full path to the lock file used to prevent concurrent installs
    pub fn lock_file_path(&self) -> Result<PathBuf> {
        Ok(sibling_with_suffix(&self.dir_path()?, ".lock"))
    }

    /// Full path to the partial file indicating an install hasn't completed
    pub fn partial_file_path(&self) -> Result<PathBuf> {
        Ok(sibling_with_suffix(&self.dir_path()?, ".partial"))
    }

    /// Remove the plugin from the cache.
    ///
    /// Leftover `.partial` and `.lock` sentinels are cleaned up
    /// opportunistically; only failure to remove the directory itself fails
    /// the operation.
    pub fn delete(&self) -> Result<()> {
        let dir = self.dir_path()?;
        fs::remove_dir_all(&dir)?;
        let _ = fs::remove_file(sibling_with_suffix(&dir, ".partial"));
        let _ = fs::remove_file(sibling_with_suffix(&dir, ".lock"));
        Ok(())
    }

    /// Populate size and timestamps from the plugin directory at `path`.
    ///
    /// Computing the size walks the whole tree, which can be expensive for
    /// plugins with deeply nested `node_modules` folders; callers opt in.
    pub fn set_file_metadata(&mut self, path: &Path) -> Result<()> {
        let metadata = fs::metadata(path)?;
        self.size = directory_size(path)?;
        // Creation time is unavailable on some platforms and filesystems.
        self.install_time = metadata.created().ok().map(DateTime::<Utc>::from);
        self.last_used_time = metadata.accessed().ok().map(DateTime::<Utc>::from);
        Ok(())
    }
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}-{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Derive `<dir>.partial` / `<dir>.lock` style sentinel paths.
fn sibling_with_suffix(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn directory_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(std::io::Error::from)?;
        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_round_trip() {
        for kind in ["analyzer", "language", "resource"] {
            let parsed: PluginKind = kind.parse().unwrap();
            assert_eq!(parsed.to_string(), kind);
        }
    }

    #[test]
    fn test_kind_rejects_unknown() {
        assert!("converter".parse::<PluginKind>().is_err());
        assert!("".parse::<PluginKind>().is_err());
        assert!("Resource".parse::<PluginKind>().is_err());
    }

    #[test]
    fn test_dir_name_with_and_without_version() {
        let mut info = PluginInfo::new(PluginKind::Resource, "aws", Some(Version::new(1, 2, 3)));
        assert_eq!(info.dir_name(), "resource-aws-v1.2.3");
        info.version = None;
        assert_eq!(info.dir_name(), "resource-aws");
    }

    #[test]
    fn test_file_name() {
        let info = PluginInfo::new(PluginKind::Language, "nodejs", None);
        assert_eq!(info.file_prefix(), "pulumi-language-nodejs");
        if cfg!(windows) {
            assert_eq!(info.file_name(), "pulumi-language-nodejs.exe");
        } else {
            assert_eq!(info.file_name(), "pulumi-language-nodejs");
        }
    }

    #[test]
    fn test_sentinel_paths_sit_next_to_dir() {
        let cache = TempDir::new().unwrap();
        let mut info = PluginInfo::new(PluginKind::Resource, "aws", Some(Version::new(1, 0, 0)));
        info.plugin_dir = Some(cache.path().to_path_buf());

        let dir = info.dir_path().unwrap();
        assert_eq!(dir, cache.path().join("resource-aws-v1.0.0"));
        assert_eq!(
            info.lock_file_path().unwrap(),
            cache.path().join("resource-aws-v1.0.0.lock")
        );
        assert_eq!(
            info.partial_file_path().unwrap(),
            cache.path().join("resource-aws-v1.0.0.partial")
        );
    }

    #[test]
    fn test_plugin_dir_regex_captures() {
        let captures = PLUGIN_DIR_REGEX.captures("resource-aws-v1.2.3").unwrap();
        assert_eq!(&captures["kind"], "resource");
        assert_eq!(&captures["name"], "aws");
        assert_eq!(&captures["version"], "1.2.3");

        // Names may themselves contain dashes
        let captures = PLUGIN_DIR_REGEX
            .captures("resource-pulumi-nodejs-v0.1.0-beta")
            .unwrap();
        assert_eq!(&captures["name"], "pulumi-nodejs");
        assert_eq!(&captures["version"], "0.1.0-beta");

        assert!(PLUGIN_DIR_REGEX.captures("resource-aws").is_none());
        assert!(PLUGIN_DIR_REGEX.captures("no-dash-vhere-").is_none());
    }

    #[test]
    fn test_installing_regex() {
        assert!(INSTALLING_REGEX.is_match("resource-aws-v2.0.0.tmp42"));
        assert!(!INSTALLING_REGEX.is_match("resource-aws-v2.0.0"));
        assert!(!INSTALLING_REGEX.is_match("resource-aws-v2.0.0.tmp"));
    }

    #[test]
    fn test_delete_removes_dir_and_sentinels() {
        let cache = TempDir::new().unwrap();
        let mut info = PluginInfo::new(PluginKind::Resource, "aws", Some(Version::new(1, 0, 0)));
        info.plugin_dir = Some(cache.path().to_path_buf());

        fs::create_dir_all(info.dir_path().unwrap()).unwrap();
        fs::write(info.partial_file_path().unwrap(), b"").unwrap();
        fs::write(info.lock_file_path().unwrap(), b"").unwrap();

        info.delete().unwrap();

        assert!(!info.dir_path().unwrap().exists());
        assert!(!info.partial_file_path().unwrap().exists());
        assert!(!info.lock_file_path().unwrap().exists());
    }

    #[test]
    fn test_set_file_metadata_counts_nested_files() {
        let cache = TempDir::new().unwrap();
        let mut info = PluginInfo::new(PluginKind::Resource, "aws", Some(Version::new(1, 0, 0)));
        info.plugin_dir = Some(cache.path().to_path_buf());

        let dir = info.dir_path().unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a"), vec![0u8; 10]).unwrap();
        fs::write(dir.join("nested/b"), vec![0u8; 32]).unwrap();

        info.set_file_metadata(&dir).unwrap();
        assert_eq!(info.size, 42);
        assert!(info.last_used_time.is_some());
    }
}
