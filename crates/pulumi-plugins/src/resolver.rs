//! End-to-end plugin resolution
//!
//! Given a kind, name, and optional version, find the plugin executable to
//! run: first the ambient `$PATH` (unless opted out), then — for bundled
//! plugins — next to the running executable, then the plugin cache.

use std::fs;
use std::path::PathBuf;

use semver::Version;
use tracing::debug;

use pulumi_core::{is_truthy, Error, Result};

use crate::cache;
use crate::plugin::{plugin_cache_dir, PluginInfo, PluginKind};
use crate::select::{exact_version_range, legacy_plugin_search_enabled, select_compatible_plugin};

/// Find a plugin's path by kind, name, and optional version.
///
/// Returns `(dir_path, executable_path)`; the directory is empty when the
/// plugin was resolved from `$PATH` or next to the current executable. The
/// cache match is the latest installed version satisfying the request.
///
/// A plugin on `$PATH` overrides the cache entirely, supporting development
/// scenarios; set `PULUMI_IGNORE_AMBIENT_PLUGINS` to a truthy value to opt
/// out. Bundled plugins — language hosts and the pulumi-nodejs/pulumi-python
/// resource shims that ship next to the CLI — are always eligible for
/// ambient search.
pub fn get_plugin_path(
    kind: PluginKind,
    name: &str,
    version: Option<&Version>,
) -> Result<(PathBuf, PathBuf)> {
    let is_bundled = kind == PluginKind::Language
        || (kind == PluginKind::Resource && name == "pulumi-nodejs")
        || (kind == PluginKind::Resource && name == "pulumi-python");

    let opt_out = std::env::var("PULUMI_IGNORE_AMBIENT_PLUGINS")
        .map(|value| is_truthy(&value))
        .unwrap_or(false);
    let include_ambient = !opt_out || is_bundled;

    let request = PluginInfo::new(kind, name, version.cloned());
    let filename = request.file_prefix();

    if include_ambient {
        if let Ok(path) = which::which(&filename) {
            debug!(
                "get_plugin_path({}, {}, {:?}): found on $PATH {}",
                kind,
                name,
                version,
                path.display()
            );
            return Ok((PathBuf::new(), path));
        }
    }

    // Bundled plugins ship next to the CLI binary. The folder is usually on
    // $PATH and caught above, but the CLI may have been invoked by explicit
    // path or through a symlink, so probe its real location too.
    if is_bundled {
        if let Some(candidate) = find_bundled_sibling(&filename) {
            debug!(
                "get_plugin_path({}, {}, {:?}): found next to current executable {}",
                kind,
                name,
                version,
                candidate.display()
            );
            return Ok((PathBuf::new(), candidate));
        }
    }

    // Otherwise, check the plugin cache.
    let plugins = cache::get_plugins()?;

    let matched = match version {
        Some(version) if !legacy_plugin_search_enabled() => {
            let range = exact_version_range(version)?;
            select_compatible_plugin(plugins, kind, name, &range).ok()
        }
        _ => legacy_match(plugins, kind, name, version),
    };

    match matched {
        Some(found) => {
            let dir = found.dir_path()?;
            let path = found.file_path()?;
            debug!(
                "get_plugin_path({}, {}, {:?}): found in cache at {}",
                kind,
                name,
                version,
                path.display()
            );
            Ok((dir, path))
        }
        None => Err(Error::missing_plugin(
            kind.to_string(),
            name,
            version.cloned(),
            include_ambient,
        )),
    }
}

/// The pre-range selection rule: newest version ≥ the requested version, or
/// the newest overall when no version was requested.
fn legacy_match(
    plugins: Vec<PluginInfo>,
    kind: PluginKind,
    name: &str,
    version: Option<&Version>,
) -> Option<PluginInfo> {
    let mut best: Option<PluginInfo> = None;
    for plugin in plugins {
        if plugin.kind != kind || plugin.name != name {
            continue;
        }

        let newer_than_best = match &best {
            Some(current) => {
                current.version.is_none()
                    || matches!(
                        (&plugin.version, &current.version),
                        (Some(candidate), Some(current)) if candidate > current
                    )
            }
            None => false,
        };

        let take = if best.is_none() && version.is_none() {
            // No existing match, no version requested: take it.
            true
        } else if newer_than_best {
            true
        } else {
            matches!(
                (version, &plugin.version),
                (Some(requested), Some(actual)) if actual >= requested
            )
        };

        if take {
            best = Some(plugin);
        }
    }
    best
}

/// Probe for a bundled plugin next to the (symlink-resolved) current
/// executable. On Windows both `.exe` and `.cmd` are candidates.
fn find_bundled_sibling(filename: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let full_path = fs::canonicalize(exe_path).ok()?;
    let dir = full_path.parent()?;

    for extension in candidate_extensions() {
        let candidate = dir.join(format!("{filename}{extension}"));
        if let Ok(metadata) = fs::metadata(&candidate) {
            if is_executable(&metadata) {
                return Some(candidate);
            }
        }
    }
    None
}

fn candidate_extensions() -> &'static [&'static str] {
    if cfg!(windows) {
        &[".exe", ".cmd"]
    } else {
        &[""]
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    // Windows reports no execute bit; trust that the file can be launched.
    true
}

/// Returns true if the given plugin is fully installed: its directory exists
/// and no `.partial` marker sits next to it.
pub fn has_plugin(plugin: &PluginInfo) -> bool {
    let Ok(dir) = plugin.dir_path() else {
        return false;
    };
    if fs::metadata(&dir).is_err() {
        return false;
    }
    match plugin.partial_file_path() {
        Ok(partial) => fs::metadata(partial).is_err(),
        Err(_) => false,
    }
}

/// Returns true if the given plugin exists at the requested version or
/// greater.
///
/// In range mode a requested version runs through the same compatible-plugin
/// selection as the runtime loader, so installs and runtime lookups agree on
/// what counts as present. Legacy mode keeps the older linear ≥ scan.
pub fn has_plugin_gte(plugin: &PluginInfo) -> Result<bool> {
    // An exact match answers immediately.
    if has_plugin(plugin) {
        return Ok(true);
    }

    let root = match &plugin.plugin_dir {
        Some(dir) => dir.clone(),
        None => plugin_cache_dir()?,
    };
    let installed = cache::scan_plugin_dir(&root, true)?;

    if !legacy_plugin_search_enabled() {
        if let Some(version) = &plugin.version {
            let range = exact_version_range(version)?;
            return select_compatible_plugin(installed, plugin.kind, &plugin.name, &range)
                .map(|_| true);
        }
    }

    Ok(installed.iter().any(|candidate| {
        candidate.name == plugin.name
            && candidate.kind == plugin.kind
            && matches!(
                (&candidate.version, &plugin.version),
                (Some(actual), Some(requested)) if actual >= requested
            )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(kind: PluginKind, name: &str, version: Option<&str>) -> PluginInfo {
        PluginInfo::new(
            kind,
            name,
            version.map(|v| Version::parse(v).unwrap()),
        )
    }

    #[test]
    fn test_legacy_match_newest_overall_without_version() {
        let plugins = vec![
            plugin(PluginKind::Resource, "aws", Some("1.0.0")),
            plugin(PluginKind::Resource, "aws", Some("2.0.0")),
            plugin(PluginKind::Resource, "aws", Some("1.5.0")),
        ];
        let best = legacy_match(plugins, PluginKind::Resource, "aws", None).unwrap();
        assert_eq!(best.version.unwrap().to_string(), "2.0.0");
    }

    #[test]
    fn test_legacy_match_newest_gte_requested() {
        let plugins = vec![
            plugin(PluginKind::Resource, "aws", Some("1.0.0")),
            plugin(PluginKind::Resource, "aws", Some("1.5.0")),
            plugin(PluginKind::Resource, "aws", Some("2.0.0")),
        ];
        let requested = Version::new(1, 2, 0);
        let best =
            legacy_match(plugins, PluginKind::Resource, "aws", Some(&requested)).unwrap();
        // Unlike range mode, legacy happily jumps major versions.
        assert_eq!(best.version.unwrap().to_string(), "2.0.0");
    }

    #[test]
    fn test_legacy_match_nothing_gte_requested() {
        let plugins = vec![plugin(PluginKind::Resource, "aws", Some("1.0.0"))];
        let requested = Version::new(2, 0, 0);
        let best = legacy_match(plugins, PluginKind::Resource, "aws", Some(&requested));
        assert!(best.is_none());
    }

    #[test]
    fn test_legacy_match_ignores_other_plugins() {
        let plugins = vec![
            plugin(PluginKind::Resource, "gcp", Some("9.0.0")),
            plugin(PluginKind::Language, "aws", Some("9.0.0")),
        ];
        assert!(legacy_match(plugins, PluginKind::Resource, "aws", None).is_none());
    }
}
