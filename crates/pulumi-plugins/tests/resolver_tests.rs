//! Resolver integration tests
//!
//! The resolver consults the process environment (PULUMI_HOME, PATH, the
//! ambient opt-out, and the legacy-search flag), so every scenario touching
//! the environment lives in one test function; parallel tests must not race
//! on process-wide state.

mod common;

use std::fs;

use common::*;
use pulumi_core::Error;
use pulumi_plugins::{get_plugin_path, has_plugin_gte, PluginKind};
use semver::Version;
use tempfile::TempDir;

#[test]
fn resolver_environment_scenarios() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("plugins");
    fs::create_dir_all(&cache).unwrap();

    std::env::set_var("PULUMI_HOME", home.path());
    std::env::remove_var("PULUMI_IGNORE_AMBIENT_PLUGINS");
    std::env::remove_var("PULUMI_ENABLE_LEGACY_PLUGIN_SEARCH");

    write_installed_plugin(&cache, PluginKind::Resource, "random", "4.2.0");
    write_installed_plugin(&cache, PluginKind::Resource, "random", "4.3.0");

    // Exact version resolves from the cache.
    let (dir, executable) =
        get_plugin_path(PluginKind::Resource, "random", Some(&Version::new(4, 2, 0))).unwrap();
    assert_eq!(dir, cache.join("resource-random-v4.2.0"));
    assert!(executable.ends_with("pulumi-resource-random"));

    // No version requested: the newest installed wins.
    let (dir, _) = get_plugin_path(PluginKind::Resource, "random", None).unwrap();
    assert_eq!(dir, cache.join("resource-random-v4.3.0"));

    // A version nothing satisfies shapes a missing-plugin error carrying the
    // ambient flag.
    let missing = get_plugin_path(PluginKind::Resource, "random", Some(&Version::new(9, 9, 9)));
    match missing {
        Err(Error::MissingPlugin { include_ambient, .. }) => assert!(include_ambient),
        other => panic!("expected missing plugin, got {:?}", other.map(|_| ())),
    }
    let message = get_plugin_path(PluginKind::Resource, "random", Some(&Version::new(9, 9, 9)))
        .unwrap_err()
        .to_string();
    assert!(message.contains("pulumi plugin install resource random v9.9.9"));

    // An ambient plugin on $PATH overrides the cache.
    let ambient_bin = TempDir::new().unwrap();
    write_executable(&ambient_bin.path().join("pulumi-resource-random"));
    let original_path = std::env::var_os("PATH").unwrap_or_default();
    let mut paths: Vec<_> = std::env::split_paths(&original_path).collect();
    paths.insert(0, ambient_bin.path().to_path_buf());
    std::env::set_var("PATH", std::env::join_paths(paths).unwrap());

    let (dir, executable) = get_plugin_path(PluginKind::Resource, "random", None).unwrap();
    assert_eq!(dir, std::path::PathBuf::new());
    assert!(executable.starts_with(ambient_bin.path()));

    // Opting out of ambient search falls back to the cache.
    std::env::set_var("PULUMI_IGNORE_AMBIENT_PLUGINS", "true");
    let (dir, _) = get_plugin_path(PluginKind::Resource, "random", None).unwrap();
    assert_eq!(dir, cache.join("resource-random-v4.3.0"));

    // A non-truthy opt-out value keeps ambient search on.
    std::env::set_var("PULUMI_IGNORE_AMBIENT_PLUGINS", "0");
    let (dir, _) = get_plugin_path(PluginKind::Resource, "random", None).unwrap();
    assert_eq!(dir, std::path::PathBuf::new());

    std::env::set_var("PULUMI_IGNORE_AMBIENT_PLUGINS", "true");
    std::env::set_var("PATH", &original_path);

    // Range mode: a requested version is exact, so 4.2.0 comes back even
    // with 4.3.0 installed; legacy mode takes the newest >= instead.
    let (dir, _) =
        get_plugin_path(PluginKind::Resource, "random", Some(&Version::new(4, 2, 0))).unwrap();
    assert_eq!(dir, cache.join("resource-random-v4.2.0"));

    std::env::set_var("PULUMI_ENABLE_LEGACY_PLUGIN_SEARCH", "1");
    let (dir, _) =
        get_plugin_path(PluginKind::Resource, "random", Some(&Version::new(4, 2, 0))).unwrap();
    assert_eq!(dir, cache.join("resource-random-v4.3.0"));

    // Legacy has_plugin_gte accepts any installed version >= the request.
    let request = plugin_in_cache(&cache, PluginKind::Resource, "random", "4.0.0");
    assert!(has_plugin_gte(&request).unwrap());

    let request = plugin_in_cache(&cache, PluginKind::Resource, "random", "5.0.0");
    assert!(!has_plugin_gte(&request).unwrap());

    std::env::remove_var("PULUMI_ENABLE_LEGACY_PLUGIN_SEARCH");
    std::env::remove_var("PULUMI_IGNORE_AMBIENT_PLUGINS");
    std::env::remove_var("PULUMI_HOME");
}
