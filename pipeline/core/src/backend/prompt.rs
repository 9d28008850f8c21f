//! HTTP Prompt Backend
//!
//! Client for the prompt-synthesis service:
//! - `POST {base_url}/generate_prompt` with a bearer credential
//! - JSON body `{title, plot, genre, style, isRetro}`
//! - success body `{prompt, loadingUpdates, movieTitles, imdbIDs}`
//! - error body usually `{detail}`

use async_trait::async_trait;

use super::traits::{PromptBackend, PromptResult};
use crate::error::PromptError;
use crate::request::GenerationRequest;

/// Prompt backend reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpPromptBackend {
    /// Base URL, without trailing slash
    base_url: String,
    /// Bearer credential
    credential: Option<String>,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpPromptBackend {
    /// Create a backend for `base_url`
    pub fn new(base_url: impl Into<String>, credential: Option<String>) -> Self {
        Self::with_client(base_url, credential, reqwest::Client::new())
    }

    /// Create a backend sharing an existing HTTP client
    pub fn with_client(
        base_url: impl Into<String>,
        credential: Option<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: credential.filter(|c| !c.trim().is_empty()),
            http_client,
        }
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/generate_prompt", self.base_url)
    }
}

/// Pull `detail` out of a JSON error body, else return the body unchanged
pub(crate) fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail")? {
            serde_json::Value::String(detail) => Some(detail.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl PromptBackend for HttpPromptBackend {
    fn name(&self) -> &str {
        "prompt-http"
    }

    async fn acquire(&self, request: &GenerationRequest) -> Result<PromptResult, PromptError> {
        let credential = self
            .credential
            .as_deref()
            .ok_or(PromptError::MissingCredential)?;

        tracing::debug!(
            url = %self.generate_url(),
            title = %request.title,
            genre = %request.genre,
            "Requesting prompt"
        );

        let response = self
            .http_client
            .post(self.generate_url())
            .bearer_auth(credential)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PromptError::BackendRejected {
                status: status.as_u16(),
                body: error_detail(&body),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            PromptError::TransportFailure(format!("invalid prompt response: {e}"))
        })
    }
}
