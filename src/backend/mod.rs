//! The chat backend seam.
//!
//! [`ChatBackend`] is the only thing the session controller knows about the
//! remote service. [`HttpBackend`] is the production implementation; tests
//! substitute their own.
//!
//! # Request shapes
//!
//! - No attachments: `POST` with JSON body `{"prompt": "<text>"}`.
//! - With attachments: `POST` multipart form, field `prompt` plus one
//!   `files` part per attachment.

mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::Serialize;

use crate::chat::Attachment;
use crate::error::Result;

/// Fallback error detail when a failing response has an empty body.
pub const EMPTY_ERROR_DETAIL: &str = "The backend returned an error without details.";

/// One outbound submission.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    /// Trimmed prompt text.
    pub prompt: String,
    /// Files to send alongside the prompt, in staging order.
    pub attachments: Vec<Attachment>,
}

/// JSON body for attachment-free requests.
#[derive(Debug, Serialize)]
pub struct PromptBody<'a> {
    pub prompt: &'a str,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Whether this request goes out as multipart.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.attachments.is_empty()
    }

    #[must_use]
    pub fn json_body(&self) -> PromptBody<'_> {
        PromptBody {
            prompt: &self.prompt,
        }
    }
}

/// Sends prompts to the remote chat service.
///
/// Implementations return the decoded JSON payload on a 2xx response,
/// [`Error::Backend`](crate::Error::Backend) on any other status, and
/// [`Error::Transport`](crate::Error::Transport) or
/// [`Error::Decode`](crate::Error::Decode) when no usable response arrived.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Send one prompt and wait for the full response.
    async fn send(&self, request: PromptRequest) -> Result<serde_json::Value>;

    /// The fixed request target, for display and logging.
    fn endpoint(&self) -> &str;
}
