
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use crate::config::FetcherConfig;

/// Produces the text content of a web page.
///
/// This is the boundary to the outside world: implementations must handle
/// every failure by returning `None`, never by raising past it.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

/// HTTP client wrapper with timeout and retry logic.
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    config: FetcherConfig,
}

impl HttpClient {
    #[inline]
    pub fn new(config: FetcherConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self { agent, config }
    }

    /// Perform an HTTP GET request with retry logic.
    #[inline]
    pub async fn get(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                tokio::time::sleep(Duration::from_secs(self.config.retry_delay_seconds)).await;
            }

            match self.try_get(url).await {
                Ok(response) => {
                    debug!("Successfully fetched {} (attempt {})", url, attempt + 1);
                    return Ok(response);
                }
                Err(e) if is_retryable_error(&e) && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!("Non-retryable error for {}: {}", url, e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    /// Attempt a single HTTP GET request without retry logic.
    ///
    /// The blocking transfer runs on the blocking pool, so this future has
    /// an await point and callers can bound it with `tokio::time::timeout`
    /// even while the socket is stalled.
    async fn try_get(&self, url: &str) -> Result<String> {
        let agent = self.agent.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || fetch_once(&agent, &url))
            .await
            .context("Fetch task was cancelled")?
    }
}

fn fetch_once(agent: &Agent, url: &str) -> Result<String> {
    debug!("Making HTTP GET request to: {}", url);

    match agent.get(url).call() {
        Ok(mut response) => {
            let text = response
                .body_mut()
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {}", url))?;
            debug!("Successfully read {} bytes from {}", text.len(), url);
            Ok(text)
        }
        Err(ureq::Error::StatusCode(status)) => {
            debug!("HTTP request failed with status {}: {}", status, url);
            Err(anyhow!("HTTP error {}", status))
        }
        Err(e) => {
            debug!("HTTP request failed with transport error: {}", e);
            Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url))
        }
    }
}

impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::new(FetcherConfig::default())
    }
}

/// Check if an error is retryable (network timeouts, 5xx errors, 429).
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("timeout")
        || error_str.contains("connection")
        || error_str.contains("network")
    {
        return true;
    }

    if error_str.contains("http error 5") {
        return true;
    }

    if error_str.contains("http error 429") {
        return true;
    }

    false
}

/// Validate and normalize a URL.
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Extract the visible text content from an HTML document.
///
/// Script, style, and navigation chrome are removed; remaining text nodes
/// are joined with single spaces in document order.
#[inline]
pub fn extract_text(html: &str) -> String {
    let mut document = Html::parse_document(html);

    let unwanted_selector =
        Selector::parse("script, style, noscript, template, nav, header, footer, aside")
            .expect("valid selector");
    remove_unwanted_elements(&mut document, &unwanted_selector);

    let body_selector = Selector::parse("body").expect("valid selector");
    let text_nodes: Vec<&str> = document.select(&body_selector).next().map_or_else(
        || document.root_element().text().collect(),
        |body| body.text().collect(),
    );

    let text = text_nodes
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    debug!("Extracted {} chars of text", text.len());
    text
}

/// Remove unwanted elements from an HTML document.
fn remove_unwanted_elements(document: &mut Html, unwanted_selector: &Selector) {
    // Collect node IDs first to avoid borrowing issues while detaching.
    let unwanted_node_ids: Vec<_> = document
        .select(unwanted_selector)
        .map(|element| element.id())
        .collect();

    for node_id in unwanted_node_ids {
        if let Some(mut node) = document.tree.get_mut(node_id) {
            node.detach();
        }
    }
}

/// [`TextSource`] backed by an HTTP GET plus HTML text extraction.
pub struct HttpTextSource {
    client: HttpClient,
}

impl HttpTextSource {
    #[inline]
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            client: HttpClient::new(config),
        }
    }
}

#[async_trait]
impl TextSource for HttpTextSource {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        if let Err(e) = validate_url(url) {
            warn!("Rejecting URL {}: {}", url, e);
            return None;
        }

        let html = match self.client.get(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error extracting text from URL {}: {:#}", url, e);
                return None;
            }
        };

        let text = extract_text(&html);
        if text.trim().is_empty() {
            warn!("No text content found at {}", url);
            return None;
        }

        Some(text)
    }
}
