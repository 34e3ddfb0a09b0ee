//! Error types for shield-net.
//!
//! Request errors surface to the caller as a rejected outcome; callers keep
//! their existing state untouched. Channel errors become connection-status
//! transitions. Nothing here is fatal to the process.

use shield_types::ParseError;

/// Errors from the request client and the push channel.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The backend is not reachable.
    #[error("Backend not reachable at {url}: {source}")]
    NotReachable {
        /// The URL that failed.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The backend returned an error response.
    #[error("API error: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the status line.
        message: String,
    },

    /// The push channel failed.
    #[error("Channel error: {0}")]
    Channel(String),

    /// A payload could not be interpreted.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result type for shield-net operations.
pub type Result<T> = std::result::Result<T, Error>;
