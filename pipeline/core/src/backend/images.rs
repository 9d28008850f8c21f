//! Hosted Image Service Backend
//!
//! Speaks the queue protocol of the hosted image service:
//!
//! 1. `POST {queue_url}/{model}` submits the job and returns
//!    `{request_id, status_url, response_url}`
//! 2. `GET {status_url}?logs=1` is polled on a fixed interval until the status
//!    is `COMPLETED`; `IN_PROGRESS` log lines are traced for diagnostics only
//! 3. `GET {response_url}` returns `{images: [{url}]}` (some models wrap it in
//!    `{data: ...}`)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;

use super::traits::ImageBackend;
use crate::error::ImageError;
use crate::gallery::GeneratedArtifact;

/// Default queue endpoint
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
/// Default model
pub const DEFAULT_MODEL: &str = "fal-ai/flux/dev";
/// Default aspect ratio preset
pub const DEFAULT_IMAGE_SIZE: &str = "portrait_4_3";

/// Image service settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageServiceConfig {
    /// Queue endpoint
    pub queue_url: String,
    /// Model path appended to the queue endpoint
    pub model: String,
    /// Aspect ratio preset
    pub image_size: String,
    /// Status poll period
    pub poll_interval: Duration,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ImageOutput {
    #[serde(default)]
    images: Option<Vec<ImageRef>>,
    #[serde(default)]
    data: Option<Box<ImageOutput>>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

impl ImageOutput {
    fn into_artifacts(self) -> Vec<GeneratedArtifact> {
        match (self.images, self.data) {
            (Some(images), _) => images
                .into_iter()
                .map(|image| GeneratedArtifact::new(image.url))
                .collect(),
            (None, Some(data)) => data.into_artifacts(),
            (None, None) => Vec::new(),
        }
    }
}

/// Image backend for the hosted queue service
#[derive(Clone, Debug)]
pub struct FalImageBackend {
    config: ImageServiceConfig,
    credential: Option<String>,
    http_client: reqwest::Client,
}

impl FalImageBackend {
    /// Create a backend with the given settings and credential
    pub fn new(config: ImageServiceConfig, credential: Option<String>) -> Self {
        Self::with_client(config, credential, reqwest::Client::new())
    }

    /// Create a backend sharing an existing HTTP client
    pub fn with_client(
        config: ImageServiceConfig,
        credential: Option<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            credential: credential.filter(|c| !c.trim().is_empty()),
            http_client,
        }
    }

    /// Current settings
    #[must_use]
    pub fn config(&self) -> &ImageServiceConfig {
        &self.config
    }

    fn submit_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.queue_url.trim_end_matches('/'),
            self.config.model.trim_matches('/')
        )
    }

    fn request_url(&self, request_id: &str, suffix: &str) -> String {
        format!("{}/requests/{request_id}{suffix}", self.submit_url())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        credential: &str,
    ) -> Result<T, ImageError> {
        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("Key {credential}"))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ImageError::synthesis(format!(
                "image service returned {status}: {}",
                super::prompt::error_detail(&body)
            )));
        }
        serde_json::from_str(&body).map_err(ImageError::synthesis)
    }

    async fn wait_for_completion(&self, status_url: &str, credential: &str) -> Result<(), ImageError> {
        let url = format!("{status_url}?logs=1");
        let mut ticker = tokio::time::interval(self.config.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut logs_seen = 0usize;

        loop {
            ticker.tick().await;
            let status: QueueStatus = self.get_json(&url, credential).await?;

            let logs = status.logs.unwrap_or_default();
            for log in logs.iter().skip(logs_seen) {
                tracing::debug!(message = %log.message, "Image generation progress");
            }
            logs_seen = logs_seen.max(logs.len());

            match status.status.as_str() {
                "COMPLETED" => {
                    return match status.error {
                        Some(error) => Err(ImageError::synthesis(error)),
                        None => Ok(()),
                    };
                }
                "IN_QUEUE" | "IN_PROGRESS" => {
                    tracing::trace!(status = %status.status, "Image job pending");
                }
                other => {
                    return Err(ImageError::synthesis(format!(
                        "image job ended with status {other}: {}",
                        status.error.unwrap_or_default()
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl ImageBackend for FalImageBackend {
    fn name(&self) -> &str {
        "fal-queue"
    }

    async fn invoke(&self, prompt: &str, count: u8) -> Result<Vec<GeneratedArtifact>, ImageError> {
        let credential = self
            .credential
            .as_deref()
            .ok_or_else(|| ImageError::synthesis("image service credential is not configured"))?;

        let body = serde_json::json!({
            "prompt": prompt,
            "num_images": count,
            "image_size": self.config.image_size,
        });

        let response = self
            .http_client
            .post(self.submit_url())
            .header(reqwest::header::AUTHORIZATION, format!("Key {credential}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ImageError::synthesis(format!(
                "image service rejected the job ({status}): {}",
                super::prompt::error_detail(&text)
            )));
        }
        let submission: QueueSubmission =
            serde_json::from_str(&text).map_err(ImageError::synthesis)?;

        tracing::debug!(
            request_id = %submission.request_id,
            model = %self.config.model,
            count,
            "Image job queued"
        );

        let status_url = submission
            .status_url
            .unwrap_or_else(|| self.request_url(&submission.request_id, "/status"));
        let response_url = submission
            .response_url
            .unwrap_or_else(|| self.request_url(&submission.request_id, ""));

        self.wait_for_completion(&status_url, credential).await?;

        let output: ImageOutput = self.get_json(&response_url, credential).await?;
        let artifacts = output.into_artifacts();
        tracing::info!(
            request_id = %submission.request_id,
            images = artifacts.len(),
            "Image job completed"
        );
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_accepts_both_shapes() {
        let flat: ImageOutput =
            serde_json::from_str(r#"{"images": [{"url": "a"}, {"url": "b"}]}"#).unwrap();
        assert_eq!(
            flat.into_artifacts(),
            vec![GeneratedArtifact::new("a"), GeneratedArtifact::new("b")]
        );

        let wrapped: ImageOutput =
            serde_json::from_str(r#"{"data": {"images": [{"url": "c"}]}}"#).unwrap();
        assert_eq!(wrapped.into_artifacts(), vec![GeneratedArtifact::new("c")]);

        let empty: ImageOutput = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert!(empty.into_artifacts().is_empty());
    }

    #[test]
    fn test_fallback_urls() {
        let backend = FalImageBackend::new(
            ImageServiceConfig {
                queue_url: "https://queue.test/".to_string(),
                ..ImageServiceConfig::default()
            },
            Some("key".to_string()),
        );
        assert_eq!(backend.submit_url(), "https://queue.test/fal-ai/flux/dev");
        assert_eq!(
            backend.request_url("abc", "/status"),
            "https://queue.test/fal-ai/flux/dev/requests/abc/status"
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_synthesis_failure() {
        let backend = FalImageBackend::new(ImageServiceConfig::default(), None);
        let err = backend.invoke("prompt", 3).await.unwrap_err();
        assert_eq!(
            err,
            ImageError::synthesis("image service credential is not configured")
        );
    }
}
