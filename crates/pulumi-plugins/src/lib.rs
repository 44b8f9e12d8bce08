//! Plugin resolution, acquisition and installation for the Pulumi CLI
//!
//! This crate manages the local on-disk cache of versioned, named executable
//! plugins:
//! - Canonical naming and cache path derivation
//! - Scanning installed plugins, filtering partial or in-flight entries
//! - Picking the best installed version for a semver range
//! - Downloading release tarballs through a source fallback chain
//!   (override URL, GitHub releases, authenticated private releases, the
//!   get.pulumi.com mirror)
//! - Crash-safe concurrent installation using per-plugin file locks and
//!   partial-install markers
//! - Post-extraction dependency bootstrapping for Node.js and Python
//!   plugins
//!
//! # Example
//!
//! ```no_run
//! use pulumi_plugins::{get_plugin_path, PluginKind};
//!
//! fn main() -> pulumi_core::Result<()> {
//!     let (_plugin_dir, executable) =
//!         get_plugin_path(PluginKind::Resource, "aws", None)?;
//!     println!("launching {}", executable.display());
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod github;
pub mod install;
pub mod manifest;
pub mod overrides;
pub mod plugin;
pub mod progress;
pub mod resolver;
pub mod select;
pub mod source;

pub use cache::{get_plugins, get_plugins_with_metadata, scan_plugin_dir};
pub use github::GitHubSource;
pub use install::install;
pub use manifest::{load_plugin_manifest, PluginManifest};
pub use overrides::OverrideTable;
pub use plugin::{plugin_cache_dir, PluginInfo, PluginKind};
pub use progress::reader_with_progress;
pub use resolver::{get_plugin_path, has_plugin, has_plugin_gte};
pub use select::select_compatible_plugin;
pub use source::{FallbackSource, MirrorSource, PluginSource, UrlSource};
