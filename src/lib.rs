//! Chat Relay
//!
//! A terminal chat client that forwards prompts, optionally with file
//! attachments, to one fixed HTTP chat endpoint and keeps the resulting
//! conversation in memory.
//!
//! # Architecture
//!
//! - **Session**: single-flight controller owning transcript, input and attachments
//! - **Backend**: trait seam with a reqwest implementation (JSON or multipart)
//! - **Config**: defaults, YAML file, environment and CLI layered with `config` + `clap`
//!
//! # Modules
//!
//! - [`backend`]: Outbound request construction and response handling
//! - [`chat`]: Messages, attachments, reply decoding and display catalog
//! - [`config`]: CLI flags and layered configuration
//! - [`session`]: The chat session controller

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]

pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod session;

pub use error::{Error, Result};
