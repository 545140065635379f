use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::fetcher::HttpTextSource;
use crate::oracle::HttpOracle;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::queue::TaskQueue;
use crate::storage::{FsCache, FsObjectStore};
use crate::{QaError, Result};

/// Default base directory for config and stores (`~/.local/share/urlqa`
/// or the platform equivalent).
#[inline]
pub fn default_base_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("urlqa"))
        .ok_or_else(|| QaError::Config("Could not determine a local data directory".to_string()))
}

/// Load the config from the default base directory.
#[inline]
pub fn load_config() -> Result<Config> {
    Ok(Config::load(default_base_dir()?)?)
}

/// Wire the concrete collaborators into a pipeline.
#[inline]
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let embedder = EmbeddingClient::new(&config.embedding)?;
    // A model that cannot be reached is fatal before any work starts.
    embedder.health_check()?;

    Ok(Pipeline::new(
        Arc::new(HttpTextSource::new(config.fetcher.clone())),
        Arc::new(embedder),
        Arc::new(HttpOracle::new(&config.oracle)?),
        Arc::new(FsObjectStore::new(config.store_path())),
        Arc::new(FsCache::new(config.cache_path())),
        PipelineConfig::from_settings(&config.pipeline),
    ))
}

/// Answer a question about a URL, dispatching through the task queue the
/// way a long-running service would.
#[inline]
pub async fn ask(url: &str, question: &str, workers: usize) -> Result<String> {
    let config = load_config()?;
    let pipeline = Arc::new(build_pipeline(&config)?);

    let queue = TaskQueue::start(pipeline, workers);
    let handle = queue.submit(url, question).await?;

    info!("Submitted question for {}", url);
    handle.wait().await
}

/// Print the active configuration as TOML.
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| QaError::Config(format!("Failed to render config: {e}")))?;

    println!("# {}", config.config_file_path().display());
    print!("{rendered}");
    Ok(())
}

/// Write the config file with current (or default) values so it can be
/// edited by hand.
#[inline]
pub fn init_config() -> Result<()> {
    let config = load_config()?;
    config.save()?;
    println!("Wrote {}", config.config_file_path().display());
    Ok(())
}
