//! Network error types.

/// Errors that can occur during HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The server answered with a non-success status code.
    #[error("{url} returned HTTP status {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be completed (DNS, TLS, connect, timeout...).
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying error description.
        reason: String,
    },

    /// Reading the response body or writing it out failed.
    #[error("I/O error while transferring {url}: {source}")]
    Io {
        /// The requested URL.
        url: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the network crate.
pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    /// Maps a ureq error for `url` onto a [`NetError`].
    pub fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Io(source) => Self::Io {
                url: url.to_string(),
                source,
            },
            other => Self::Transport {
                url: url.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Returns `true` if the server reported 404 Not Found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
