//! Conversation core.
//!
//! This module holds the message model, the in-memory conversation state and
//! the engine that streams answers from the retrieval service into it.
//!
//! # Architecture
//!
//! - [`Message`] / [`QueryMode`]: one side of a turn and the mode it was asked in
//! - [`Conversation`]: ordered messages, loading flag, current mode
//! - [`RetrievalTransport`]: opens a chunked answer stream for a request
//! - [`ChatSession`]: `send_message`, `clear_messages`, `toggle_mode`
//!
//! # Example
//!
//! ```rust
//! use data_copilot::chat::QueryMode;
//!
//! let mode = QueryMode::default();
//! assert_eq!(mode.as_str(), "structured");
//! assert_eq!(mode.toggled().toggled(), mode);
//! ```

mod decoder;
mod message;
mod session;
mod store;
mod transport;

pub use decoder::ChunkDecoder;
pub use message::{Message, ParseModeError, QueryMode, Role};
pub use session::{ChatSession, ERROR_MESSAGE, SessionOptions, TurnOutcome};
pub use store::{Conversation, ConversationSnapshot};
pub use transport::{ChunkStream, HttpRetrievalClient, RetrievalRequest, RetrievalTransport};
