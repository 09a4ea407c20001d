//! Builds the orchestrator and its collaborators from a `GameConfig`.

use crate::config::{EmbedderProvider, GameConfig, GeneratorProvider};
use crate::engine::{AttemptOrchestrator, Collaborators};
use crate::providers::embedder::fake::FakeEmbedder;
use crate::providers::embedder::http::HttpEmbedder;
use crate::providers::embedder::Embedder;
use crate::providers::imagegen::fake::FakeImageGenerator;
use crate::providers::imagegen::fal::FalImageGenerator;
use crate::providers::imagegen::ImageGenerator;
use crate::storage::Store;
use std::sync::Arc;

pub fn open_store(cfg: &GameConfig) -> anyhow::Result<Store> {
    let store = Store::open(&cfg.db)?;
    store.init_schema()?;
    Ok(store)
}

pub fn build_embedder(cfg: &GameConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match cfg.embedder.provider {
        EmbedderProvider::Http => {
            let url = cfg
                .embedder
                .base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("config error: embedder.base_url is not set"))?;
            Arc::new(HttpEmbedder::new(url))
        }
        EmbedderProvider::Fake => Arc::new(FakeEmbedder::new(cfg.embedder.dims.unwrap_or(64))),
    };
    Ok(embedder)
}

pub fn build_generator(cfg: &GameConfig) -> anyhow::Result<Option<Arc<dyn ImageGenerator>>> {
    Ok(match cfg.generator.provider {
        GeneratorProvider::None => None,
        GeneratorProvider::Fake => Some(Arc::new(FakeImageGenerator) as Arc<dyn ImageGenerator>),
        GeneratorProvider::Fal => {
            let key = cfg
                .generator
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("config error: FAL_API_KEY is not set"))?;
            Some(Arc::new(FalImageGenerator::new(cfg.generator.model.clone(), key)) as Arc<dyn ImageGenerator>)
        }
    })
}

pub fn build_orchestrator(cfg: &GameConfig, store: Store) -> anyhow::Result<AttemptOrchestrator> {
    cfg.validate()?;
    let store = Arc::new(store);
    let parts = Collaborators {
        challenges: store.clone(),
        guesses: store,
        embedder: build_embedder(cfg)?,
        generator: build_generator(cfg)?,
    };
    tracing::debug!(
        event = "promptle.bootstrap",
        scoring_mode = ?cfg.scoring_mode,
        embedder = parts.embedder.model_id(),
        generator = parts.generator.as_ref().map(|g| g.provider_name()).unwrap_or("none")
    );
    AttemptOrchestrator::new(parts, cfg.scoring_mode, cfg.timeouts, cfg.embedder.dims)
}
