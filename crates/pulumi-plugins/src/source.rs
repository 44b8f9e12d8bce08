//! Plugin download sources and the fallback chain
//!
//! A [`PluginSource`] knows how to fetch a plugin tarball for a version and
//! platform, and (for release hosts) how to discover the latest version. The
//! concrete kinds are a closed set:
//!
//! - [`UrlSource`]: a single endpoint template, used for explicit
//!   `plugin_download_url` values and override-table matches
//! - [`GitHubSource`]: GitHub releases, optionally authenticated
//! - [`MirrorSource`]: the get.pulumi.com vendor mirror
//! - [`FallbackSource`]: public GitHub, then (in experimental mode) a private
//!   GitHub org, then the vendor mirror

use semver::Version;
use tracing::debug;

use pulumi_core::http::{query_escape, HttpBody, HttpSession};
use pulumi_core::{Error, Result};

use crate::github::GitHubSource;
use crate::overrides::download_url_overrides;
use crate::plugin::{PluginInfo, PluginKind};

/// Base URL of the vendor mirror
const PLUGIN_MIRROR_URL: &str = "https://get.pulumi.com/releases/plugins";

/// The canonical archive filename for a plugin release artifact
pub(crate) fn plugin_archive_name(
    kind: PluginKind,
    name: &str,
    version: &Version,
    os: &str,
    arch: &str,
) -> String {
    format!("pulumi-{kind}-{name}-v{version}-{os}-{arch}.tar.gz")
}

/// Substitute `${VERSION}`, `${OS}` and `${ARCH}` placeholders, URL-escaped.
fn interpolate_url(server_url: &str, version: &Version, os: &str, arch: &str) -> String {
    server_url
        .replace("${VERSION}", &query_escape(&version.to_string()))
        .replace("${OS}", &query_escape(os))
        .replace("${ARCH}", &query_escape(arch))
}

/// Build the full download endpoint under a base URL.
fn download_endpoint(
    base_url: &str,
    kind: PluginKind,
    name: &str,
    version: &Version,
    os: &str,
    arch: &str,
) -> String {
    let server_url = interpolate_url(base_url, version, os, arch);
    let server_url = server_url.trim_end_matches('/');
    format!(
        "{}/{}",
        server_url,
        query_escape(&plugin_archive_name(kind, name, version, os, arch))
    )
}

/// A source with a caller-supplied endpoint template
#[derive(Debug, Clone)]
pub struct UrlSource {
    name: String,
    kind: PluginKind,
    url: String,
}

impl UrlSource {
    pub fn new(name: impl Into<String>, kind: PluginKind, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
        }
    }

    pub fn download(
        &self,
        session: &HttpSession,
        version: &Version,
        os: &str,
        arch: &str,
    ) -> Result<HttpBody> {
        let endpoint = download_endpoint(&self.url, self.kind, &self.name, version, os, arch);
        debug!("{} downloading from {}", self.name, endpoint);
        session.get(&endpoint, None, None)
    }
}

/// The get.pulumi.com vendor mirror
#[derive(Debug, Clone)]
pub struct MirrorSource {
    name: String,
    kind: PluginKind,
}

impl MirrorSource {
    pub fn new(name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn download(
        &self,
        session: &HttpSession,
        version: &Version,
        os: &str,
        arch: &str,
    ) -> Result<HttpBody> {
        let endpoint =
            download_endpoint(PLUGIN_MIRROR_URL, self.kind, &self.name, version, os, arch);
        debug!("{} downloading from {}", self.name, endpoint);
        session.get(&endpoint, None, None)
    }
}

/// The default source: public GitHub, optionally a private GitHub org, then
/// the vendor mirror.
#[derive(Debug, Clone)]
pub struct FallbackSource {
    name: String,
    kind: PluginKind,
}

impl FallbackSource {
    pub fn new(name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The private release source, available only in experimental mode with a
    /// configured owner and authentication.
    fn private_github_source(&self) -> Result<GitHubSource> {
        let repo_owner = std::env::var("GITHUB_REPOSITORY_OWNER").unwrap_or_default();
        if repo_owner.is_empty() {
            return Err(Error::source_config("ENV[GITHUB_REPOSITORY_OWNER] not set"));
        }
        let private = GitHubSource::new(repo_owner, self.name.clone(), self.kind);
        if !private.has_authentication() {
            return Err(Error::source_config(
                "no GitHub authentication information provided",
            ));
        }
        Ok(private)
    }

    pub fn latest_version(&self, session: &HttpSession) -> Result<Version> {
        // Try and get this package from the public Pulumi org first.
        let public = GitHubSource::new("pulumi", self.name.clone(), self.kind);
        let public_err = match public.latest_version(session) {
            Ok(version) => return Ok(version),
            Err(err) => err,
        };

        if std::env::var_os("PULUMI_EXPERIMENTAL").is_some() {
            let private_err = match self.private_github_source() {
                Ok(private) => match private.latest_version(session) {
                    Ok(version) => return Ok(version),
                    Err(err) => err,
                },
                Err(err) => err,
            };

            debug!(
                "cannot find plugin {} on private GitHub releases: {}",
                self.name, private_err
            );
            return Err(Error::LatestVersionFallback {
                public: Box::new(public_err),
                private: Box::new(private_err),
            });
        }

        Err(public_err)
    }

    pub fn download(
        &self,
        session: &HttpSession,
        version: &Version,
        os: &str,
        arch: &str,
    ) -> Result<HttpBody> {
        let public = GitHubSource::new("pulumi", self.name.clone(), self.kind);
        let public_err = match public.download(session, version, os, arch) {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };
        debug!(
            "cannot find plugin {} on public GitHub releases: {}",
            self.name, public_err
        );

        if std::env::var_os("PULUMI_EXPERIMENTAL").is_some() {
            match self.private_github_source() {
                Ok(private) => match private.download(session, version, os, arch) {
                    Ok(body) => return Ok(body),
                    Err(err) => debug!(
                        "cannot find plugin {} on private GitHub releases: {}",
                        self.name, err
                    ),
                },
                Err(err) => debug!(
                    "cannot find plugin {} on private GitHub releases: {}",
                    self.name, err
                ),
            }
        }

        // Final fallthrough to the vendor mirror.
        MirrorSource::new(self.name.clone(), self.kind).download(session, version, os, arch)
    }
}

/// A polymorphic handle over the concrete source kinds
#[derive(Debug, Clone)]
pub enum PluginSource {
    Url(UrlSource),
    GitHub(GitHubSource),
    Mirror(MirrorSource),
    Fallback(FallbackSource),
}

impl PluginSource {
    /// Fetch the plugin tarball as a streaming body plus optional length.
    pub fn download(
        &self,
        session: &HttpSession,
        version: &Version,
        os: &str,
        arch: &str,
    ) -> Result<HttpBody> {
        match self {
            Self::Url(source) => source.download(session, version, os, arch),
            Self::GitHub(source) => source.download(session, version, os, arch),
            Self::Mirror(source) => source.download(session, version, os, arch),
            Self::Fallback(source) => source.download(session, version, os, arch),
        }
    }

    /// Find the latest released version of this plugin, where supported.
    pub fn latest_version(&self, session: &HttpSession) -> Result<Version> {
        match self {
            Self::Url(_) => Err(Error::LatestVersionNotSupported(
                "plugins using PluginDownloadURL",
            )),
            Self::GitHub(source) => source.latest_version(session),
            Self::Mirror(_) => Err(Error::LatestVersionNotSupported(
                "plugins from get.pulumi.com",
            )),
            Self::Fallback(source) => source.latest_version(session),
        }
    }
}

/// Map the running platform onto the release artifact OS tag.
fn current_os() -> Result<&'static str> {
    match std::env::consts::OS {
        "macos" => Ok("darwin"),
        "linux" => Ok("linux"),
        "windows" => Ok("windows"),
        other => Err(Error::UnsupportedOs(other.to_string())),
    }
}

/// Map the running platform onto the release artifact architecture tag.
fn current_arch() -> Result<&'static str> {
    match std::env::consts::ARCH {
        "x86_64" => Ok("amd64"),
        "aarch64" => Ok("arm64"),
        other => Err(Error::UnsupportedArch(other.to_string())),
    }
}

impl PluginInfo {
    /// Pick the download source for this plugin.
    ///
    /// An explicit `plugin_download_url` wins, then the override table, then
    /// the default fallback chain.
    pub fn source(&self) -> PluginSource {
        if let Some(url) = &self.plugin_download_url {
            return PluginSource::Url(UrlSource::new(self.name.clone(), self.kind, url.clone()));
        }

        if let Some(url) = download_url_overrides().get(&self.name) {
            return PluginSource::Url(UrlSource::new(self.name.clone(), self.kind, url));
        }

        PluginSource::Fallback(FallbackSource::new(self.name.clone(), self.kind))
    }

    /// Find the latest released version of this plugin.
    pub fn latest_version(&self, session: &HttpSession) -> Result<Version> {
        self.source().latest_version(session)
    }

    /// Fetch this plugin's tarball for the current platform.
    ///
    /// The platform is validated before any network I/O; only
    /// darwin/linux/windows on amd64/arm64 have release artifacts.
    pub fn download(&self, session: &HttpSession) -> Result<HttpBody> {
        let os = current_os()?;
        let arch = current_arch()?;

        let version = self
            .version
            .as_ref()
            .ok_or_else(|| Error::UnknownVersion(self.name.clone()))?;

        self.source().download(session, version, os, arch)
    }
}
