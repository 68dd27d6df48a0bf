//! Chat session management.
//!
//! A [`ChatSession`] holds one conversation: the transcript, the input
//! buffer, staged attachments and the error slot. It submits prompts
//! through a [`ChatBackend`](crate::backend::ChatBackend) one at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chat_relay::backend::HttpBackend;
//! use chat_relay::config::EndpointConfig;
//! use chat_relay::session::{ChatSession, SessionOptions};
//!
//! # async fn example() -> chat_relay::Result<()> {
//! let backend = HttpBackend::new(&EndpointConfig::new("http://localhost:8000", "/chat"))?;
//! let session = ChatSession::new(Arc::new(backend), SessionOptions::default());
//!
//! session.submit("Hello!").await?;
//! assert_eq!(session.messages().len(), 3);
//! # Ok(())
//! # }
//! ```

mod controller;

pub use controller::{ChatSession, FALLBACK_REPLY, Outcome, SessionOptions, TRANSPORT_ERROR};
