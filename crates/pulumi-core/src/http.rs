//! HTTP download helper with retries
//!
//! All plugin downloads and release-metadata lookups go through
//! [`HttpSession`], which owns a blocking reqwest client carrying the
//! Pulumi user agent. Transient failures (transport errors and 5xx
//! responses) are retried with doubling backoff before surfacing an error.

use std::io::Read;
use std::thread;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, Result};

/// Maximum request attempts before giving up
const MAX_ATTEMPTS: u32 = 5;

/// Initial retry backoff, doubled on each subsequent attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Characters left unescaped by [`query_escape`]: unreserved URL characters
const QUERY_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-escape a value for embedding into a URL path or query.
pub fn query_escape(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ESCAPED).to_string()
}

/// A successful response: a streaming body plus the advertised length, if any.
pub struct HttpBody {
    response: reqwest::blocking::Response,
}

impl HttpBody {
    /// Content length advertised by the server, if known
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }
}

impl Read for HttpBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.response.read(buf)
    }
}

/// Blocking HTTP session used for plugin downloads
pub struct HttpSession {
    client: reqwest::blocking::Client,
}

impl HttpSession {
    /// Create a session with the standard Pulumi user agent
    pub fn new() -> Result<Self> {
        let user_agent = format!(
            "pulumi-cli/1 ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        );
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// GET a URL, retrying transient failures.
    ///
    /// When `token` is present it is sent as `Authorization: token <token>`.
    /// Non-2xx responses become [`Error::Download`]; a 404 from the GitHub
    /// API additionally hints at providing a token for private repositories.
    pub fn get(&self, url: &str, token: Option<&str>, accept: Option<&str>) -> Result<HttpBody> {
        debug!("full plugin download url: {}", url);

        let mut attempt = 0;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            attempt += 1;

            let mut request = self.client.get(url);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(HttpBody { response });
                    }
                    if !status.is_server_error() || attempt >= MAX_ATTEMPTS {
                        return Err(download_error(url, status));
                    }
                    debug!(
                        "retrying {} after HTTP {} (attempt {}/{})",
                        url, status, attempt, MAX_ATTEMPTS
                    );
                }
                Err(err) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(Error::Http(err));
                    }
                    debug!(
                        "retrying {} after transport error: {} (attempt {}/{})",
                        url, err, attempt, MAX_ATTEMPTS
                    );
                }
            }

            thread::sleep(backoff);
            backoff *= 2;
        }
    }
}

fn download_error(url: &str, status: StatusCode) -> Error {
    let hint = if status == StatusCode::NOT_FOUND && url.starts_with("https://api.github.com/") {
        ". If this is a private GitHub repository, try providing a token via the \
         GITHUB_TOKEN environment variable. See: https://github.com/settings/tokens"
    } else {
        ""
    };
    Error::Download {
        status: status.as_u16(),
        url: url.to_string(),
        hint,
    }
}
