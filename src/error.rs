//! Error types for the chat relay.

use std::path::PathBuf;

use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (connect, DNS, TLS, body read).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {detail}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body, or a fallback when the body was empty.
        detail: String,
    },

    /// A success response whose body was not JSON.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// An attachment could not be read from disk.
    #[error("Failed to read attachment '{}': {source}", .path.display())]
    Attachment {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The prompt was empty after trimming.
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// Another submission is still in flight.
    #[error("A submission is already in progress")]
    InFlight,

    /// The session was built without attachment support.
    #[error("Attachments are disabled for this session")]
    AttachmentsDisabled,
}

/// Result type alias for chat relay operations.
pub type Result<T> = std::result::Result<T, Error>;
