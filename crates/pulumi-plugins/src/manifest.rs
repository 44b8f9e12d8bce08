//! Plugin project manifest (`PulumiPlugin.yaml`)
//!
//! An installed plugin may carry a manifest declaring the runtime its
//! executable needs. Recognized runtimes trigger dependency bootstrapping
//! after extraction; anything else is ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use pulumi_core::Result;

/// Manifest filename inside a plugin directory
pub const PLUGIN_MANIFEST_FILE: &str = "PulumiPlugin.yaml";

/// The plugin project manifest
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// The runtime the plugin executable needs
    pub runtime: RuntimeSpec,
}

/// The runtime declaration: either a bare name or a mapping with options
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuntimeSpec {
    Name(String),
    Options {
        name: String,
        #[serde(default)]
        options: BTreeMap<String, serde_yaml_ng::Value>,
    },
}

impl RuntimeSpec {
    /// The declared runtime name
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Options { name, .. } => name,
        }
    }
}

/// Load the manifest from a plugin directory, if one is present.
pub fn load_plugin_manifest(dir: &Path) -> Result<Option<PluginManifest>> {
    let path = dir.join(PLUGIN_MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let manifest: PluginManifest = serde_yaml_ng::from_str(&content)?;
    Ok(Some(manifest))
}
