//! Error types for self-updater.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while checking for or applying updates.
#[derive(Debug, Error)]
pub enum Error {
    /// Local I/O failure, including every failure reported by a write target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The release source answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status returned by the server.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// The release source answered with a body that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A release has no tag, so it cannot be resolved to an identifier.
    #[error("no tag name for release {0}")]
    MissingTag(String),

    /// An asset has no download URL.
    #[error("no download URL for asset {0:?}")]
    MissingDownloadUrl(String),

    /// The release source knows no releases.
    #[error("no release information was found")]
    NoReleaseInfo,

    /// An update was requested but the application is current.
    #[error("the application is already up to date")]
    AlreadyUpToDate,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map a `reqwest` failure, separating undecodable bodies from transport errors.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}
