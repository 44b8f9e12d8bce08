//! GitHub releases plugin source
//!
//! Downloads plugin tarballs from GitHub release assets. Without
//! authentication the predictable `releases/download` URL is fetched
//! directly; with a `GITHUB_TOKEN` the asset is resolved through the release
//! metadata API first, which also works for private repositories. This is
//! the only source kind that supports latest-version discovery.

use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use pulumi_core::http::{query_escape, HttpBody, HttpSession};
use pulumi_core::version::parse_tolerant;
use pulumi_core::{Error, Result};

use crate::plugin::PluginKind;
use crate::source::plugin_archive_name;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_DOWNLOAD_BASE: &str = "https://github.com";

/// Release metadata subset consumed from the GitHub API
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// A single release asset
#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    url: String,
}

/// A plugin source backed by GitHub releases of `<organization>/pulumi-<name>`
#[derive(Debug, Clone)]
pub struct GitHubSource {
    organization: String,
    name: String,
    kind: PluginKind,
    token: Option<String>,
    api_base: String,
    download_base: String,
}

impl GitHubSource {
    /// Create a source, picking up authentication from the environment.
    pub fn new(organization: impl Into<String>, name: impl Into<String>, kind: PluginKind) -> Self {
        // GITHUB_PERSONAL_ACCESS_TOKEN stopped being honored when basic auth
        // was dropped in favor of the token header; warn anyone still setting
        // it.
        if std::env::var_os("GITHUB_PERSONAL_ACCESS_TOKEN").is_some() {
            warn!(
                "GITHUB_PERSONAL_ACCESS_TOKEN is no longer used for GitHub authentication, \
                 set GITHUB_TOKEN instead"
            );
        }

        Self {
            organization: organization.into(),
            name: name.into(),
            kind,
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            api_base: GITHUB_API_BASE.to_string(),
            download_base: GITHUB_DOWNLOAD_BASE.to_string(),
        }
    }

    /// Point the source at alternate endpoints (used by tests).
    pub fn with_endpoints(
        mut self,
        api_base: impl Into<String>,
        download_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.download_base = download_base.into();
        self
    }

    /// Replace the token picked up from the environment (used by tests).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// True when a `GITHUB_TOKEN` is available
    pub fn has_authentication(&self) -> bool {
        self.token.is_some()
    }

    /// The release repository name, `pulumi-<plugin name>`
    fn repository(&self) -> String {
        format!("pulumi-{}", self.name)
    }

    /// Find the newest released version by querying `releases/latest`.
    pub fn latest_version(&self, session: &HttpSession) -> Result<Version> {
        let release_url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base,
            self.organization,
            self.repository()
        );
        debug!("plugin GitHub releases url: {}", release_url);

        let body = session.get(&release_url, self.token.as_deref(), Some("application/json"))?;
        let release: Release = serde_json::from_reader(body)?;
        parse_tolerant(&release.tag_name)
    }

    /// Download the release asset for the given version and platform.
    pub fn download(
        &self,
        session: &HttpSession,
        version: &Version,
        os: &str,
        arch: &str,
    ) -> Result<HttpBody> {
        let asset_name = plugin_archive_name(self.kind, &self.name, version, os, arch);

        if !self.has_authentication() {
            // Without authentication the predictable download URL suffices.
            debug!(
                "{} downloading from {}/{}/{}/releases",
                self.name,
                self.download_base,
                self.organization,
                self.repository()
            );
            let plugin_url = format!(
                "{}/{}/{}/releases/download/v{}/{}",
                self.download_base,
                self.organization,
                self.repository(),
                version,
                query_escape(&asset_name)
            );
            return session.get(&plugin_url, None, None);
        }

        // With authentication the asset must be looked up via the release
        // metadata API, whose asset URLs also work for private repositories.
        let release_url = format!(
            "{}/repos/{}/{}/releases/tags/v{}",
            self.api_base,
            self.organization,
            self.repository(),
            version
        );
        debug!("plugin GitHub releases url: {}", release_url);

        let body = session.get(&release_url, self.token.as_deref(), Some("application/json"))?;
        let release: Release = serde_json::from_reader(body)?;

        let asset = release
            .assets
            .iter()
            .find(|asset| asset.name == asset_name)
            .ok_or_else(|| Error::AssetNotFound(asset_name.clone()))?;

        debug!("{} downloading from {}", self.name, asset.url);
        session.get(&asset.url, self.token.as_deref(), Some("application/octet-stream"))
    }
}
