//! Outbound retrieval requests.
//!
//! The [`RetrievalTransport`] trait is the seam between the chat engine and
//! the network. [`HttpRetrievalClient`] is the production implementation:
//! it POSTs `{ "user_query", "rag_type" }` as JSON and hands back the
//! response body as a stream of raw byte chunks.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::message::QueryMode;
use crate::error::{Error, Result};

/// Body chunks in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// JSON payload sent to the retrieval endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Trimmed user text.
    pub user_query: String,
    /// Mode active when the turn started.
    pub rag_type: QueryMode,
}

/// Opens a streamed answer for one turn.
#[async_trait::async_trait]
pub trait RetrievalTransport: Send + Sync + std::fmt::Debug {
    /// Send the request and return the body stream once the response is accepted.
    ///
    /// Non-success statuses and bodiless responses are errors here, before any
    /// chunk is produced.
    async fn open(&self, request: &RetrievalRequest) -> Result<ChunkStream>;
}

/// reqwest-backed transport for the retrieval endpoint.
#[derive(Debug, Clone)]
pub struct HttpRetrievalClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpRetrievalClient {
    /// Create a client for `endpoint` (e.g. `http://localhost:8000/retrieval`).
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(endpoint: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { http, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl RetrievalTransport for HttpRetrievalClient {
    async fn open(&self, request: &RetrievalRequest) -> Result<ChunkStream> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Err(Error::MissingBody);
        }

        let chunks = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from));
        Ok(Box::pin(chunks))
    }
}
