//! Common test infrastructure for pulumi-plugins tests
//!
//! Provides builders for fake plugin tarballs and pre-populated cache
//! directories, shared across the integration test files.

// Allow unused helpers - not every test file uses the whole kit
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use semver::Version;

use pulumi_plugins::{PluginInfo, PluginKind};

/// Build a plugin record rooted at an explicit cache directory.
pub fn plugin_in_cache(cache: &Path, kind: PluginKind, name: &str, version: &str) -> PluginInfo {
    let mut info = PluginInfo::new(kind, name, Some(Version::parse(version).unwrap()));
    info.plugin_dir = Some(cache.to_path_buf());
    info
}

/// Build an in-memory gzip-compressed tarball from (name, content) entries.
pub fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, *name, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A minimal plugin tarball carrying just the expected executable.
pub fn plugin_tarball(kind: PluginKind, name: &str) -> Vec<u8> {
    let executable = format!("pulumi-{kind}-{name}");
    tarball(&[(executable.as_str(), b"#!/bin/sh\nexit 0\n".as_slice())])
}

/// Materialize an installed plugin directly on disk, bypassing the installer.
pub fn write_installed_plugin(cache: &Path, kind: PluginKind, name: &str, version: &str) {
    let dir = cache.join(format!("{kind}-{name}-v{version}"));
    fs::create_dir_all(&dir).unwrap();
    write_executable(&dir.join(format!("pulumi-{kind}-{name}")));
}

/// Write a file and mark it executable.
pub fn write_executable(path: &Path) {
    fs::write(path, b"#!/bin/sh\nexit 0\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }
}
