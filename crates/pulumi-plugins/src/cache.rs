//! Cache scanner
//!
//! Enumerates installed plugins by reading the immediate children of the
//! cache root. Entries that are not directories, look like in-flight temp
//! directories, fail the canonical name pattern, or carry a `.partial`
//! sibling are invisible to scanning.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use pulumi_core::version::parse_tolerant;
use pulumi_core::Result;

use crate::plugin::{plugin_cache_dir, PluginInfo, PluginKind, INSTALLING_REGEX, PLUGIN_DIR_REGEX};

/// Returns installed plugins without size or timestamp metadata.
///
/// Plugin size requires recursively traversing the plugin directory, which
/// can be extremely expensive with deeply nested `node_modules` folders.
pub fn get_plugins() -> Result<Vec<PluginInfo>> {
    scan_plugin_dir(&plugin_cache_dir()?, true)
}

/// Returns installed plugins with size and timestamp metadata (slow).
pub fn get_plugins_with_metadata() -> Result<Vec<PluginInfo>> {
    scan_plugin_dir(&plugin_cache_dir()?, false)
}

/// Scan an explicit cache root. A missing root yields an empty list.
pub fn scan_plugin_dir(dir: &Path, skip_metadata: bool) -> Result<Vec<PluginInfo>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    // Enumerate in filename order so selection rules that scan linearly see
    // a deterministic sequence.
    let mut entries = entries.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut plugins = Vec::new();
    for entry in entries {
        let Some((kind, name, version)) = try_plugin(&entry) else {
            continue;
        };

        let path = entry.path();

        // A .partial sibling means the plugin is not fully installed.
        let mut partial = path.as_os_str().to_os_string();
        partial.push(".partial");
        match fs::metadata(&partial) {
            Ok(_) => continue,
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut plugin = PluginInfo::new(kind, name, Some(version));
        plugin.plugin_dir = Some(dir.to_path_buf());
        plugin.path = path.clone();
        if !skip_metadata {
            plugin.set_file_metadata(&path)?;
        }
        plugins.push(plugin);
    }
    Ok(plugins)
}

/// Returns the plugin identity encoded in a directory entry's name, if any.
fn try_plugin(entry: &fs::DirEntry) -> Option<(PluginKind, String, semver::Version)> {
    // Only directories contain plugins.
    let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
    if !is_dir {
        debug!("skipping file in plugin directory: {:?}", entry.file_name());
        return None;
    }

    let file_name = entry.file_name();
    let name = file_name.to_str()?;

    // Ignore plugins which are being installed
    if INSTALLING_REGEX.is_match(name) {
        debug!("skipping plugin {} which is being installed", name);
        return None;
    }

    let captures = PLUGIN_DIR_REGEX.captures(name)?;

    let kind = match captures["kind"].parse::<PluginKind>() {
        Ok(kind) => kind,
        Err(_) => {
            debug!("skipping invalid plugin kind: {}", &captures["kind"]);
            return None;
        }
    };
    let plugin_name = captures["name"].to_string();
    let version = match parse_tolerant(&captures["version"]) {
        Ok(version) => version,
        Err(_) => {
            debug!("skipping invalid plugin version: {}", &captures["version"]);
            return None;
        }
    };

    Some((kind, plugin_name, version))
}
