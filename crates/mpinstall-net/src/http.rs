//! Blocking HTTP access.

use std::io::{self, Write};
use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::error::{NetError, Result};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("mpinstall/", env!("CARGO_PKG_VERSION"));

/// The HTTP operations mpinstall needs.
///
/// Each call is a single attempt; callers surface failures immediately.
pub trait Fetcher {
    /// GETs `url` and returns the body as text.
    fn get_text(&self, url: &str) -> Result<String>;

    /// HEADs `url` and returns its `Content-Length`, if the server sent one.
    fn content_length(&self, url: &str) -> Result<Option<u64>>;

    /// GETs `url`, streaming the body into `dest`. Returns the byte count.
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64>;
}

/// [`Fetcher`] backed by a ureq [`Agent`].
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| NetError::from_ureq(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| NetError::from_ureq(url, e))
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>> {
        debug!(url, "HEAD");
        let response = self
            .agent
            .head(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| NetError::from_ureq(url, e))?;
        Ok(response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok()))
    }

    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        debug!(url, "GET (download)");
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| NetError::from_ureq(url, e))?;
        let mut reader = response.into_body().into_reader();
        io::copy(&mut reader, dest).map_err(|source| NetError::Io {
            url: url.to_string(),
            source,
        })
    }
}
