
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::EmbeddingConfig;
use crate::{QaError, Result};

/// Dimension of the default `all-minilm` embedding model.
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maps a batch of text strings to fixed-dimension vectors in a shared
/// similarity space.
///
/// Implementations must be deterministic for a fixed model: equal inputs
/// yield equal vectors, one per input string, in input order. The concrete
/// model is fixed at construction and shared read-only by concurrent
/// invocations.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed dimensionality of every vector this embedder produces.
    fn dimension(&self) -> usize;
}

/// HTTP client for an Ollama-style embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .endpoint()
            .map_err(|e| QaError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size,
            dimension: config.dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Verify that the embedding service is reachable and serves the
    /// configured model.
    ///
    /// Failure here is fatal to the invocation: the caller gets
    /// [`QaError::ModelUnavailable`] and no retry happens at this layer.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!(
            "Performing health check for embedding service at {}",
            self.base_url
        );

        self.ping()
            .map_err(|e| QaError::ModelUnavailable(format!("Server ping failed: {e:#}")))?;
        self.validate_model()
            .map_err(|e| QaError::ModelUnavailable(format!("{e:#}")))?;

        info!(
            "Health check passed for embedding service at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the embedding server to check if it's responsive.
    fn ping(&self) -> anyhow::Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build ping URL")?;

        debug!("Pinging embedding server at {}", url);

        self.request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping embedding server")?;

        Ok(())
    }

    /// Validate that the configured model is available.
    fn validate_model(&self) -> anyhow::Result<()> {
        let models = self.list_models().context("Failed to list models")?;

        if models.iter().any(|m| m.name == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                self.model,
                available_models
            ))
        }
    }

    /// List all models available on the embedding server.
    #[inline]
    pub fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        Ok(models_response.models)
    }

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embedding")?;

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        Ok(embed_response.embedding)
    }

    fn embed_single_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.len() == 1 {
            // Use the single-prompt API for a one-element batch.
            let vector = self.embed_one(&texts[0])?;
            return Ok(vec![vector]);
        }

        let request = BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build batch embedding URL")?;

        let request_json = serde_json::to_string(&request)
            .context("Failed to serialize batch embedding request")?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate batch embeddings")?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse batch embedding response")?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            ));
        }

        Ok(batch_response.embeddings)
    }

    /// Run `send` until it succeeds, the attempt budget runs out, or the
    /// failure is one a retry cannot fix. Backoff doubles between attempts.
    fn request_with_retry<F>(&self, mut send: F) -> anyhow::Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match send() {
                Ok(body) => return Ok(body),
                // A 4xx will not get better on a retry.
                Err(ureq::Error::StatusCode(status)) if status < 500 => {
                    return Err(anyhow!(
                        "Embedding service rejected the request: HTTP {status}"
                    ));
                }
                Err(error) => {
                    let transient = matches!(
                        error,
                        ureq::Error::StatusCode(_)
                            | ureq::Error::ConnectionFailed
                            | ureq::Error::HostNotFound
                            | ureq::Error::Timeout(_)
                            | ureq::Error::Io(_)
                    );
                    if !transient {
                        return Err(anyhow!("Embedding request failed: {error}"));
                    }

                    warn!(
                        "Embedding request attempt {}/{} failed: {}",
                        attempt, self.retry_attempts, error
                    );
                    last_error = Some(anyhow!("Embedding request failed: {error}"));

                    if attempt < self.retry_attempts {
                        debug!("Backing off {:?} before the next attempt", backoff);
                        std::thread::sleep(backoff);
                        backoff *= 2;
                    }
                }
            }
        }

        error!(
            "Giving up on {} after {} attempts",
            self.base_url, self.retry_attempts
        );

        Err(last_error.unwrap_or_else(|| anyhow!("Embedding request made no attempts")))
    }
}

impl Embedder for EmbeddingClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());

        // Process in batches to avoid overwhelming the server.
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_vectors = self
                .embed_single_batch(batch)
                .map_err(|e| QaError::ModelUnavailable(format!("{e:#}")))?;
            vectors.extend(batch_vectors);
        }

        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(QaError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
