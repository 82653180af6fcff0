//! Error types for release discovery.

/// Errors that can occur while locating the release to install.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// The release listing could not be retrieved.
    #[error("failed to fetch release listing from {url}: {reason}")]
    Network {
        /// The listing URL that was requested.
        url: String,
        /// Underlying transport error description.
        reason: String,
    },

    /// The listing contained no parseable version.
    #[error("no release versions found in listing at {url}")]
    NotFound {
        /// The listing URL that was scanned.
        url: String,
    },

    /// A version string could not be parsed.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Creates a [`ReleaseError::Network`] for the given URL.
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a [`ReleaseError::NotFound`] for the given URL.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Returns `true` if this is a [`ReleaseError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a [`ReleaseError::Network`].
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
