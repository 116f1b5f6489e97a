//! Data Copilot
//!
//! A streaming chat client for a retrieval service that answers questions in
//! one of two query modes, `structured` or `unstructured`.
//!
//! # Architecture
//!
//! - **Chat core**: conversation state plus the engine that streams each
//!   answer into an assistant placeholder as chunks arrive
//! - **Transport**: reqwest POST to the retrieval endpoint, body read as a byte stream
//! - **History**: read/delete client for saved conversations
//! - **Terminal UI**: stdin commands, transcript rendered from state snapshots
//!
//! # Modules
//!
//! - [`chat`]: messages, conversation state, retrieval transport, session engine
//! - [`config`]: layered configuration (defaults, file, environment, CLI)
//! - [`history`]: chat history API client
//! - [`repl`]: terminal presentation layer
//! - [`telemetry`]: tracing subscriber setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::default_trait_access)]

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod repl;
pub mod telemetry;

pub use error::{Error, Result};
