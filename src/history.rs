//! Client for the chat history endpoints.
//!
//! The history list is owned by the backend; this client only reads and
//! deletes entries. Listing is best effort and falls back to an empty list.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};

/// One saved conversation, as listed by `GET /chat/history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub date: String,
}

/// HTTP client for `{base}/chat/history`.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HistoryClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'.
        let mut base = base_url.as_ref().trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;
        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List saved conversations. Any failure yields an empty list.
    pub async fn list(&self) -> Vec<ChatSummary> {
        match self.try_list().await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "Error fetching chat history");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<ChatSummary>> {
        let response = self.http.get(self.url("chat/history")?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Delete a saved conversation. The response body is ignored.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut url = self.url("chat/history")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(id);

        let response = self.http.delete(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Status {
                status: status.as_u16(),
            })
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}
