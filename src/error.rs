//! Error types for the upload workflow.
//!
//! Every failure ends the current attempt and is shown to the user as one
//! message. The variants keep enough detail for logging, while
//! [`UploadError::user_message`] produces the text the error indicator shows.

use std::path::PathBuf;
use thiserror::Error;

/// Generic text shown when the request never produced an HTTP response.
pub const NETWORK_FAILURE_MESSAGE: &str = "Failed to process image. Please try again.";

/// Local checks that run before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared media type is not in the accepted list
    #[error("Please select an image file (JPEG, PNG, GIF, WebP or BMP). '{media_type}' is not supported.")]
    UnsupportedType { media_type: String },

    /// File is bigger than the configured ceiling
    #[error("File is too large ({}). Maximum size is {}.", format_size(*.size), format_size(*.limit))]
    TooLarge { size: u64, limit: u64 },

    /// URL-reference input is empty or not an http(s) URL
    #[error("Please enter a valid PDF URL")]
    InvalidUrl,
}

/// All the ways one upload attempt can fail.
///
/// `Clone` because the error travels back to the UI inside a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// No response at all (DNS, TLS, refused connection, timeout...)
    #[error("Network error: {0}")]
    Network(String),

    /// The response arrived but did not contain what we expected
    #[error("{0}")]
    Protocol(String),

    /// The selected file could not be read from disk
    #[error("Could not read '{}': {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl UploadError {
    /// The single line shown by the error indicator.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// True for errors raised before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, UploadError::Validation(_))
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Network(err.to_string())
    }
}

/// Human-readable byte count ("10 MB", "512 KB", "12 B").
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        let whole = bytes / MB;
        let tenths = (bytes % MB) * 10 / MB;
        if tenths == 0 {
            format!("{} MB", whole)
        } else {
            format!("{}.{} MB", whole, tenths)
        }
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}
