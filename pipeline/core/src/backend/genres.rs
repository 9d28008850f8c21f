//! HTTP Genre Catalog

use anyhow::Context;
use async_trait::async_trait;

use super::traits::GenreCatalog;

/// Genre catalog served by the prompt backend
#[derive(Clone, Debug)]
pub struct HttpGenreCatalog {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpGenreCatalog {
    /// Create a catalog for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a catalog sharing an existing HTTP client
    pub fn with_client(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn genres_url(&self) -> String {
        format!("{}/get_available_genres", self.base_url)
    }
}

#[async_trait]
impl GenreCatalog for HttpGenreCatalog {
    async fn fetch_genres(&self) -> anyhow::Result<Vec<String>> {
        let url = self.genres_url();
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("genre catalog returned {status}: {body}");
        }

        let genres: Vec<String> = response
            .json()
            .await
            .context("decoding genre list")?;
        tracing::debug!(count = genres.len(), "Fetched genres");
        Ok(genres)
    }
}
