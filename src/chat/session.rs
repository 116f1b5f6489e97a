//! Chat session: the turn lifecycle and streaming ingestion.
//!
//! A [`ChatSession`] owns the [`Conversation`] for one UI session and exposes
//! the three user intents: [`send_message`](ChatSession::send_message),
//! [`clear_messages`](ChatSession::clear_messages) and
//! [`toggle_mode`](ChatSession::toggle_mode). The state lives inside a
//! `tokio::sync::watch` channel; every mutation is published so a renderer
//! holding a [`subscribe`](ChatSession::subscribe) receiver can repaint.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use data_copilot::chat::{ChatSession, HttpRetrievalClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpRetrievalClient::new("http://localhost:8000/retrieval")?;
//! let session = ChatSession::new(Arc::new(transport));
//!
//! session.send_message("Revenue by region last quarter").await;
//! println!("{}", session.messages()[1].content());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::decoder::ChunkDecoder;
use super::message::{Message, QueryMode};
use super::store::{ActiveTurn, Conversation, ConversationSnapshot};
use super::transport::{RetrievalRequest, RetrievalTransport};
use crate::error::{Error, Result};

/// Shown in place of the answer when a turn fails.
pub const ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

/// How a call to [`ChatSession::send_message`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Empty input, or another turn was already in flight. Nothing changed.
    Ignored,
    /// The stream reached its natural end.
    Completed,
    /// Aborted through [`ChatSession::clear_messages`].
    Cancelled,
    /// The placeholder now holds [`ERROR_MESSAGE`].
    Failed,
}

/// Session tuning.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Mode the session starts in.
    pub mode: QueryMode,
    /// Longest wait for the response headers or for the next chunk.
    /// `None` waits indefinitely.
    pub chunk_timeout: Option<Duration>,
}

/// Handle to one conversation. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    state: watch::Sender<Conversation>,
    transport: Arc<dyn RetrievalTransport>,
    chunk_timeout: Option<Duration>,
}

/// Non-error ends of the read loop.
enum StreamEnd {
    Completed,
    Cancelled,
}

impl ChatSession {
    /// Create an empty session in `structured` mode with no timeout.
    #[must_use]
    pub fn new(transport: Arc<dyn RetrievalTransport>) -> Self {
        Self::with_options(transport, SessionOptions::default())
    }

    /// Create an empty session with an explicit starting mode and timeout.
    #[must_use]
    pub fn with_options(transport: Arc<dyn RetrievalTransport>, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(Conversation::new(options.mode));
        Self {
            inner: Arc::new(SessionInner {
                state,
                transport,
                chunk_timeout: options.chunk_timeout,
            }),
        }
    }

    /// Receiver that is notified after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Conversation> {
        self.inner.state.subscribe()
    }

    /// Owned copy of the current messages, loading flag and mode.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.inner.state.borrow().to_snapshot()
    }

    /// Copy of the messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.borrow().messages().to_vec()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.inner.state.borrow().mode()
    }

    /// Flip between `structured` and `unstructured`, returning the new mode.
    ///
    /// Past messages keep the mode they were created with. Whether toggling
    /// is allowed mid-turn is up to the caller.
    pub fn toggle_mode(&self) -> QueryMode {
        let mut mode = QueryMode::default();
        self.inner.state.send_modify(|conv| {
            mode = conv.mode().toggled();
            conv.set_mode(mode);
        });
        debug!(%mode, "Mode toggled");
        mode
    }

    pub fn set_mode(&self, mode: QueryMode) {
        self.inner.state.send_if_modified(|conv| {
            if conv.mode() == mode {
                return false;
            }
            conv.set_mode(mode);
            true
        });
    }

    /// Abort the in-flight request, if any, and drop every message.
    pub fn clear_messages(&self) {
        let mut aborted = None;
        self.inner.state.send_modify(|conv| aborted = conv.reset());
        match aborted {
            Some(turn) => info!(turn = turn.turn, "Conversation cleared, request aborted"),
            None => debug!("Conversation cleared"),
        }
    }

    /// Run one turn to completion.
    ///
    /// Appends the user message and an empty assistant placeholder, then
    /// streams the answer into the placeholder chunk by chunk. Failures end
    /// up as [`ERROR_MESSAGE`] in the placeholder rather than as an `Err`.
    pub async fn send_message(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let mut started = None;
        self.inner.state.send_if_modified(|conv| {
            started = conv.begin_turn(text);
            started.is_some()
        });
        let Some(turn) = started else {
            debug!("Turn already in flight, ignoring input");
            return TurnOutcome::Ignored;
        };

        debug!(turn = turn.turn, mode = %turn.mode, "Starting turn");
        let request = RetrievalRequest {
            user_query: text.to_string(),
            rag_type: turn.mode,
        };

        let outcome = match self.stream_turn(&turn, &request).await {
            Ok(StreamEnd::Completed) => TurnOutcome::Completed,
            Ok(StreamEnd::Cancelled) => TurnOutcome::Cancelled,
            Err(_) if turn.cancel.is_cancelled() => TurnOutcome::Cancelled,
            Err(err) => {
                error!(turn = turn.turn, error = %err, "Chat error");
                self.inner.state.send_if_modified(|conv| {
                    conv.is_active(turn.turn) && conv.replace_content(turn.placeholder, ERROR_MESSAGE)
                });
                TurnOutcome::Failed
            }
        };

        self.inner
            .state
            .send_if_modified(|conv| conv.finish_turn(turn.turn));
        outcome
    }

    async fn stream_turn(&self, turn: &ActiveTurn, request: &RetrievalRequest) -> Result<StreamEnd> {
        let mut chunks = tokio::select! {
            biased;
            () = turn.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            opened = self.within_timeout(self.inner.transport.open(request)) => opened??,
        };

        let mut decoder = ChunkDecoder::new();
        let mut applied = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                () = turn.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = self.within_timeout(chunks.next()) => next?,
            };
            let Some(chunk) = next else {
                break;
            };

            let text = decoder.decode(&chunk?)?;
            if text.is_empty() {
                continue;
            }

            let written = self.inner.state.send_if_modified(|conv| {
                !turn.cancel.is_cancelled() && conv.append_content(turn.placeholder, &text)
            });
            if !written {
                return Ok(StreamEnd::Cancelled);
            }
            applied += 1;
        }

        decoder.finish()?;
        info!(turn = turn.turn, chunks = applied, "Turn completed");
        Ok(StreamEnd::Completed)
    }

    async fn within_timeout<F: Future>(&self, fut: F) -> Result<F::Output> {
        match self.inner.chunk_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_elapsed| Error::Timeout),
            None => Ok(fut.await),
        }
    }
}
