
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::OracleConfig;
use crate::{QaError, Result};

/// The external answering service: given a question and a context chunk,
/// produce a natural-language answer.
///
/// Returns `None` on any failure; errors never cross this boundary.
#[async_trait]
pub trait AnswerOracle: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Option<String>;
}

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
}

/// HTTP-backed [`AnswerOracle`] authenticating with a bearer token.
pub struct HttpOracle {
    api_url: Url,
    api_key: String,
    agent: ureq::Agent,
}

impl HttpOracle {
    /// Build the oracle client from config, reading the bearer credential
    /// from the environment variable the config names.
    #[inline]
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            QaError::Config(format!(
                "Missing oracle API key: environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        Self::with_credential(&config.api_url, api_key, config.timeout_seconds)
    }

    /// Build the oracle client with an explicit endpoint and credential.
    #[inline]
    pub fn with_credential(api_url: &str, api_key: String, timeout_seconds: u64) -> Result<Self> {
        let api_url =
            Url::parse(api_url).map_err(|e| QaError::Config(format!("Invalid oracle URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            api_url,
            api_key,
            agent,
        })
    }

    fn request_answer(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let request = AnswerRequest { question, context };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize answer request")?;

        let mut response = self
            .agent
            .post(self.api_url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .context("Answer request failed")?;

        let response_text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read answer response body")?;

        let answer_response: AnswerResponse =
            serde_json::from_str(&response_text).context("Failed to parse answer response")?;

        if answer_response.answer.trim().is_empty() {
            return Err(anyhow!("Answering service returned an empty answer"));
        }

        Ok(answer_response.answer)
    }
}

#[async_trait]
impl AnswerOracle for HttpOracle {
    async fn answer(&self, question: &str, context: &str) -> Option<String> {
        debug!(
            "Requesting answer for question ({} chars) with context ({} chars)",
            question.len(),
            context.len()
        );

        match self.request_answer(question, context) {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!("Error calling answering service: {:#}", e);
                None
            }
        }
    }
}
