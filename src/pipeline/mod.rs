
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::PipelineSettings;
use crate::embeddings::Embedder;
use crate::fetcher::TextSource;
use crate::oracle::AnswerOracle;
use crate::storage::{self, ObjectStore, QaCache};
use crate::{QaError, Result, retriever, segmenter};

/// Per-invocation settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of sentences per retrieval chunk.
    pub group_size: usize,
    pub fetch_timeout: Duration,
    pub answer_timeout: Duration,
}

impl Default for PipelineConfig {
    #[inline]
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl PipelineConfig {
    #[inline]
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            group_size: settings.group_size,
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_seconds),
            answer_timeout: Duration::from_secs(settings.answer_timeout_seconds),
        }
    }
}

/// One successful question/answer interaction. Created once, never
/// mutated, persisted to both the cache and the object store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Sequences fetch → segment → embed → retrieve → answer → persist over
/// injected collaborators.
///
/// Collaborators are constructed by the caller and shared read-only;
/// concurrent invocations share no other state.
pub struct Pipeline {
    text_source: Arc<dyn TextSource>,
    embedder: Arc<dyn Embedder>,
    oracle: Arc<dyn AnswerOracle>,
    store: Arc<dyn ObjectStore>,
    cache: Arc<dyn QaCache>,
    config: PipelineConfig,
}

impl Pipeline {
    #[inline]
    pub fn new(
        text_source: Arc<dyn TextSource>,
        embedder: Arc<dyn Embedder>,
        oracle: Arc<dyn AnswerOracle>,
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn QaCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            text_source,
            embedder,
            oracle,
            store,
            cache,
            config,
        }
    }

    /// Answer `question` from the contents of the page at `url`.
    ///
    /// Any step's failure aborts the invocation with the matching
    /// [`QaError`] kind; persistence failures alone are logged and
    /// swallowed.
    #[inline]
    pub async fn ask_question(&self, url: &str, question: &str) -> Result<String> {
        info!("Processing question for {}", url);

        // Fetching
        let fetch_seconds = self.config.fetch_timeout.as_secs();
        let text = timeout(self.config.fetch_timeout, self.text_source.fetch_text(url))
            .await
            .map_err(|_| QaError::Timeout {
                stage: "Fetching",
                seconds: fetch_seconds,
            })?
            .ok_or_else(|| QaError::FetchFailed {
                url: url.to_string(),
            })?;

        self.persist(&storage::text_key(url), &text);

        // Segmenting
        let chunks = segmenter::segment(&text, self.config.group_size);
        if chunks.is_empty() {
            debug!("Text at {} produced no chunks", url);
            return Err(QaError::EmptyCandidateSet);
        }

        // Embedding: one batch call for the chunks, then a single-element
        // batch for the question, on the same embedder instance so the
        // vector spaces are comparable.
        let chunk_vectors = self.embedder.embed(&chunks)?;
        self.persist_embeddings(url, &chunk_vectors);

        let question_owned = [question.to_string()];
        let question_vector = self
            .embedder
            .embed(&question_owned)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                QaError::ModelUnavailable("Embedder returned no vector for the question".into())
            })?;

        // Retrieving
        let best_index = retriever::select_best(&question_vector, &chunk_vectors)?;
        let relevant_chunk = &chunks[best_index];
        debug!(
            "Selected chunk {} of {} for {}",
            best_index,
            chunks.len(),
            url
        );

        // Answering
        let answer_seconds = self.config.answer_timeout.as_secs();
        let answer = timeout(
            self.config.answer_timeout,
            self.oracle.answer(question, relevant_chunk),
        )
        .await
        .map_err(|_| QaError::Timeout {
            stage: "Answering",
            seconds: answer_seconds,
        })?
        .ok_or(QaError::AnswerUnavailable)?;

        // Persisting: best-effort, never affects the returned answer.
        self.persist_qa_record(question, &answer);

        info!("Answered question for {}", url);
        Ok(answer)
    }

    /// Write one artifact to the object store, logging instead of failing.
    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.put(key, value) {
            warn!("Error persisting {}: {:#}", key, e);
        }
    }

    fn persist_embeddings(&self, url: &str, vectors: &[Vec<f32>]) {
        let payload = serde_json::json!({ "embeddings": vectors });
        self.persist(&storage::embeddings_key(url), &payload.to_string());
    }

    fn persist_qa_record(&self, question: &str, answer: &str) {
        let now = Utc::now();
        let record = QaRecord {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: now,
        };

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Error serializing QA record: {}", e);
                return;
            }
        };

        // The two stores are independent; one may succeed while the other
        // fails, and neither failure surfaces to the caller.
        if let Err(e) = self.cache.set(&storage::qa_cache_key(now), &json) {
            warn!("Error caching QA record: {:#}", e);
        }
        self.persist(&storage::qa_pair_key(now), &json);
    }
}
