#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end runs of the question pipeline against mocked HTTP services
// and real filesystem stores.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use urlqa::config::{EmbeddingConfig, FetcherConfig};
use urlqa::embeddings::EmbeddingClient;
use urlqa::fetcher::HttpTextSource;
use urlqa::oracle::HttpOracle;
use urlqa::pipeline::{Pipeline, PipelineConfig, QaRecord};
use urlqa::storage::{FsCache, FsObjectStore};
use urlqa::QaError;

const PAGE_HTML: &str = "<html><body>\
    <nav>Home | About</nav>\
    <p>Cats are mammals. Dogs are loyal. The sky is blue.</p>\
    </body></html>";

fn embedding_config(server: &MockServer) -> EmbeddingConfig {
    let url = url::Url::parse(&server.uri()).expect("mock server URI should parse");
    EmbeddingConfig {
        protocol: url.scheme().to_string(),
        host: url.host_str().expect("mock server host").to_string(),
        port: url.port().expect("mock server port"),
        model: "all-minilm:latest".to_string(),
        batch_size: 16,
        dimension: 4,
    }
}

async fn mount_embedding_mocks(server: &MockServer) {
    // Chunk batch: one vector per sentence, in input order.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("\"input\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]
        })))
        .mount(server)
        .await;

    // Question vector, nearest to the first chunk.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("\"prompt\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.9, 0.1, 0.0, 0.0]
        })))
        .mount(server)
        .await;
}

fn build_pipeline(server: &MockServer, base: &TempDir) -> Pipeline {
    let embedder = EmbeddingClient::new(&embedding_config(server))
        .expect("Failed to create embedding client")
        .with_retry_attempts(1);

    let oracle = HttpOracle::with_credential(
        &format!("{}/v1/answer", server.uri()),
        "test-key".into(),
        5,
    )
    .expect("Failed to create oracle");

    let fetcher_config = FetcherConfig {
        max_retries: 0,
        ..FetcherConfig::default()
    };

    let config = PipelineConfig {
        group_size: 1,
        fetch_timeout: Duration::from_secs(5),
        answer_timeout: Duration::from_secs(5),
    };

    Pipeline::new(
        Arc::new(HttpTextSource::new(fetcher_config)),
        Arc::new(embedder),
        Arc::new(oracle),
        Arc::new(FsObjectStore::new(base.path().join("store"))),
        Arc::new(FsCache::new(base.path().join("cache"))),
        config,
    )
}

#[tokio::test]
async fn answers_a_question_and_persists_every_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cats"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_HTML))
        .mount(&server)
        .await;
    mount_embedding_mocks(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/answer"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_string_contains("Cats are mammals."))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "answer": "They are mammals."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = TempDir::new().expect("Failed to create temp dir");
    let pipeline = build_pipeline(&server, &base);

    let url = format!("{}/cats", server.uri());
    let answer = pipeline
        .ask_question(&url, "What are cats?")
        .await
        .expect("pipeline should produce an answer");
    assert_eq!(answer, "They are mammals.");

    let store = base.path().join("store");
    let sanitized = url.replace('/', "_");

    let text = std::fs::read_to_string(store.join("texts").join(format!("{sanitized}.txt")))
        .expect("page text should be persisted");
    assert_eq!(text, "Cats are mammals. Dogs are loyal. The sky is blue.");

    let embeddings_json =
        std::fs::read_to_string(store.join("embeddings").join(format!("{sanitized}.json")))
            .expect("embeddings should be persisted");
    let parsed: serde_json::Value =
        serde_json::from_str(&embeddings_json).expect("embeddings file should be JSON");
    assert_eq!(parsed["embeddings"].as_array().map(Vec::len), Some(3));

    let qa_dir = store.join("qa_pairs");
    let entries: Vec<_> = std::fs::read_dir(&qa_dir)
        .expect("qa_pairs dir should exist")
        .collect::<std::io::Result<_>>()
        .expect("qa_pairs dir should be readable");
    assert_eq!(entries.len(), 1);
    let record_json =
        std::fs::read_to_string(entries[0].path()).expect("qa record should be readable");
    let record: QaRecord =
        serde_json::from_str(&record_json).expect("qa record should deserialize");
    assert_eq!(record.question, "What are cats?");
    assert_eq!(record.answer, "They are mammals.");

    let cache_entries = std::fs::read_dir(base.path().join("cache"))
        .expect("cache dir should exist")
        .count();
    assert_eq!(cache_entries, 1);
}

#[tokio::test]
async fn answering_failure_leaves_no_qa_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cats"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_HTML))
        .mount(&server)
        .await;
    mount_embedding_mocks(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/answer"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("Failed to create temp dir");
    let pipeline = build_pipeline(&server, &base);

    let url = format!("{}/cats", server.uri());
    let result = pipeline.ask_question(&url, "What are cats?").await;
    assert!(matches!(result, Err(QaError::AnswerUnavailable)));

    // The fetched text is still saved, but no answer artifacts appear.
    assert!(base.path().join("store").join("texts").exists());
    assert!(!base.path().join("store").join("qa_pairs").exists());
}

#[tokio::test]
async fn slow_pages_hit_the_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE_HTML)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let base = TempDir::new().expect("Failed to create temp dir");
    let embedder = EmbeddingClient::new(&embedding_config(&server))
        .expect("Failed to create embedding client")
        .with_retry_attempts(1);
    let oracle = HttpOracle::with_credential(
        &format!("{}/v1/answer", server.uri()),
        "test-key".into(),
        5,
    )
    .expect("Failed to create oracle");

    // The transport timeout is longer than the stage timeout; the stage
    // timeout must still win.
    let fetcher_config = FetcherConfig {
        max_retries: 0,
        timeout_seconds: 1,
        ..FetcherConfig::default()
    };
    let config = PipelineConfig {
        group_size: 1,
        fetch_timeout: Duration::from_millis(200),
        answer_timeout: Duration::from_secs(5),
    };
    let pipeline = Pipeline::new(
        Arc::new(HttpTextSource::new(fetcher_config)),
        Arc::new(embedder),
        Arc::new(oracle),
        Arc::new(FsObjectStore::new(base.path().join("store"))),
        Arc::new(FsCache::new(base.path().join("cache"))),
        config,
    );

    let result = pipeline
        .ask_question(&format!("{}/slow", server.uri()), "What is this?")
        .await;

    assert!(matches!(
        result,
        Err(QaError::Timeout {
            stage: "Fetching",
            ..
        })
    ));
}

#[tokio::test]
async fn unreachable_page_fails_before_any_persistence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cats"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("Failed to create temp dir");
    let pipeline = build_pipeline(&server, &base);

    let url = format!("{}/cats", server.uri());
    let result = pipeline.ask_question(&url, "What are cats?").await;
    assert!(matches!(result, Err(QaError::FetchFailed { .. })));

    assert!(!base.path().join("store").join("texts").exists());
}
