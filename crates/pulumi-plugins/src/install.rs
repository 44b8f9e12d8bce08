//! Crash-safe concurrent plugin installation
//!
//! The tarball is extracted directly into the final directory rather than
//! through a temp-dir-and-rename step: the rename fails often enough on
//! hosts with aggressive virus scanners that it cannot be relied on. Crash
//! safety comes from two sentinels next to the plugin directory instead:
//!
//! - `<dir>.lock` — an advisory file lock held for the duration of one
//!   install, serializing concurrent installs of the same plugin
//! - `<dir>.partial` — a zero-byte marker created before extraction and
//!   removed after dependency bootstrap; its presence means the install is
//!   in progress or was interrupted
//!
//! A directory without a `.partial` sibling is a completed install. A
//! directory with one is torn down and re-extracted on the next attempt.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::Path;

use fs4::fs_std::FileExt;
use tracing::debug;

use pulumi_core::archive::extract_tar_gz;
use pulumi_core::Result;

use crate::bootstrap;
use crate::manifest::load_plugin_manifest;
use crate::plugin::{PluginInfo, INSTALLING_REGEX};

/// Holds the per-plugin advisory install lock; released on drop.
struct InstallLock {
    file: File,
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Acquire the file lock for this plugin, blocking until it is held.
fn acquire_install_lock(plugin: &PluginInfo) -> Result<InstallLock> {
    let lock_path = plugin.lock_file_path()?;
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&lock_path)?;
    file.lock_exclusive()?;
    Ok(InstallLock { file })
}

/// Install a plugin tarball into the cache.
///
/// Blocks until the per-plugin lock is held. If the plugin is already fully
/// installed and `reinstall` is false, returns immediately. A leftover
/// `.partial` marker from an interrupted attempt forces a full reinstall.
pub fn install(plugin: &PluginInfo, tarball: impl Read, reinstall: bool) -> Result<()> {
    if plugin.version.is_none() {
        return Err(pulumi_core::Error::UnknownVersion(plugin.name.clone()));
    }

    let final_dir = plugin.dir_path()?;

    let _lock = acquire_install_lock(plugin)?;

    // Older releases extracted into sibling temp dirs; sweep any leftovers.
    // Failure here never fails the install.
    if let Err(err) = cleanup_temp_dirs(&final_dir) {
        debug!("install: error cleaning up temp dirs: {}", err);
    }

    let partial_path = plugin.partial_file_path()?;

    // Check whether the directory appeared while we were waiting on the lock.
    match fs::metadata(&final_dir) {
        Ok(_) => {
            match fs::metadata(&partial_path) {
                Ok(_) => {
                    // A previous attempt crashed mid-install; start over.
                    fs::remove_dir_all(&final_dir)?;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    if !reinstall {
                        // Fully installed already.
                        return Ok(());
                    }
                    fs::remove_dir_all(&final_dir)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    // The partial marker goes down first: if anything below fails or the
    // process dies, the next attempt sees it and reinstalls cleanly.
    write_partial_file(&partial_path)?;
    create_plugin_dir(&final_dir)?;

    extract_tar_gz(tarball, &final_dir)?;

    // Node.js and Python plugins need their dependency trees materialized.
    // Compiled runtimes ship ready-to-run binaries; unrecognized runtimes
    // are left alone.
    if let Some(manifest) = load_plugin_manifest(&final_dir)? {
        match manifest.runtime.name().to_lowercase().as_str() {
            "nodejs" => bootstrap::install_node_dependencies(&final_dir)?,
            "python" => bootstrap::install_python_dependencies(&final_dir, "venv")?,
            _ => {}
        }
    }

    // Installation is complete.
    fs::remove_file(&partial_path)?;
    Ok(())
}

/// Remove leftover `*.tmpNNN` directories from interrupted installs.
fn cleanup_temp_dirs(final_dir: &Path) -> Result<()> {
    let Some(parent) = final_dir.parent() else {
        return Ok(());
    };

    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if entry.file_type()?.is_dir() && INSTALLING_REGEX.is_match(name) {
            debug!("cleaning up temp dir {}", name);
            fs::remove_dir_all(entry.path())?;
        }
    }
    Ok(())
}

fn write_partial_file(path: &Path) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?;
    Ok(())
}

fn create_plugin_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)
    }
}
