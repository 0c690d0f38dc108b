//! Error types for quakeview.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// The only error text a user ever sees. Every fetch failure cause
/// collapses into this banner.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch earthquake data. Please try again later.";

/// Errors that can occur while talking to the earthquake feed.
#[derive(Error, Debug)]
pub enum QuakeviewError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed returned a non-success status
    #[error("feed returned HTTP {status}")]
    Api { status: u16 },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl QuakeviewError {
    /// Message shown in the error banner, regardless of cause.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}
