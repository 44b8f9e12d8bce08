//! Version selection across installed plugins
//!
//! Given the scanned plugin list and a requested semver range, pick the
//! highest-version compatible plugin. An opt-in legacy mode substitutes the
//! older newest-greater-or-equal rule.

use std::cmp::Ordering;

use semver::{BuildMetadata, Version, VersionReq};
use tracing::debug;

use pulumi_core::{Error, Result};

use crate::plugin::{PluginInfo, PluginKind};

/// True when the older, non-range-based selection rule is requested.
pub(crate) fn legacy_plugin_search_enabled() -> bool {
    std::env::var_os("PULUMI_ENABLE_LEGACY_PLUGIN_SEARCH").is_some_and(|v| !v.is_empty())
}

/// Interpret an exact requested version as a version range.
///
/// Requests carry exact-equality semantics, not caret semantics: asking for
/// `1.2.3` must not match `1.4.0`. Build metadata never participates in
/// range matching and is dropped.
pub fn exact_version_range(version: &Version) -> Result<VersionReq> {
    let mut version = version.clone();
    version.build = BuildMetadata::EMPTY;
    VersionReq::parse(&format!("={version}"))
        .map_err(|_| Error::InvalidVersion(version.to_string()))
}

/// Order plugins ascending by version, with versionless plugins lowest.
///
/// Ties between versionless plugins are resolved arbitrarily.
pub(crate) fn compare_plugin_versions(a: &Option<Version>, b: &Option<Version>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Select the plugin with the given kind and name that best satisfies the
/// requested semver range.
///
/// Returns the highest compatible version. Plugins without a version are
/// selected only when no compatible versioned plugin exists ("there is
/// something, better than nothing").
pub fn select_compatible_plugin(
    mut plugins: Vec<PluginInfo>,
    kind: PluginKind,
    name: &str,
    requested: &VersionReq,
) -> Result<PluginInfo> {
    // Sort ascending so a single pass, lowest to greatest, leaves the best
    // match standing at the end.
    plugins.sort_by(|a, b| compare_plugin_versions(&a.version, &b.version));

    let mut best: Option<PluginInfo> = None;
    for plugin in plugins {
        if plugin.kind != kind || plugin.name != name {
            continue;
        }
        match &plugin.version {
            None if best.is_none() => {
                debug!(
                    "select({}): candidate {} has no version and there are no others yet",
                    name, plugin
                );
                best = Some(plugin);
            }
            None => {
                debug!("select({}): skipping second versionless plugin {}", name, plugin);
            }
            Some(version) if requested.matches(version) => {
                debug!("select({}): candidate {} matches the range", name, plugin);
                best = Some(plugin);
            }
            Some(_) => {
                debug!("select({}): skipping {}: range mismatch", name, plugin);
            }
        }
    }

    best.ok_or(Error::NoCompatiblePlugin)
}
