//! Cache-aside store for challenge target embeddings.
//!
//! The target image of a challenge never changes, so its embedding is filled
//! once and never invalidated. Concurrent first requests may all miss, all call
//! the embedding service and all write; the last write wins. Every writer holds
//! an equivalent vector for the same image, so no lock guards the fill and the
//! only cost of the race is redundant service calls.

use crate::embeddings::util::validate_vector;
use crate::errors::EmbeddingError;
use crate::providers::embedder::Embedder;
use crate::storage::ChallengeStore;
use crate::timeouts::{bounded, Timeouts};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetEmbedding {
    pub vector: Vec<f32>,
    /// True when the vector came from the store without an embedding call.
    pub hit: bool,
}

#[derive(Clone)]
pub struct EmbeddingCache {
    store: Arc<dyn ChallengeStore>,
    embedder: Arc<dyn Embedder>,
    timeouts: Timeouts,
    expected_dims: Option<usize>,
}

impl EmbeddingCache {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        embedder: Arc<dyn Embedder>,
        timeouts: Timeouts,
        expected_dims: Option<usize>,
    ) -> Self {
        Self {
            store,
            embedder,
            timeouts,
            expected_dims,
        }
    }

    pub async fn get_or_compute(
        &self,
        challenge_id: &str,
        image_url: &str,
    ) -> Result<TargetEmbedding, EmbeddingError> {
        // A failed read only costs an extra embedding call.
        match bounded(
            self.timeouts.storage(),
            "challenge_read",
            self.store.get_challenge(challenge_id),
        )
        .await
        {
            Ok(Some(challenge)) => {
                if let Some(v) = challenge.cached_embedding() {
                    tracing::debug!(
                        event = "promptle.embedding_cache.hit",
                        challenge_id = challenge_id,
                        dims = v.len()
                    );
                    return Ok(TargetEmbedding {
                        vector: v.to_vec(),
                        hit: true,
                    });
                }
            }
            Ok(None) => {
                tracing::warn!(
                    event = "promptle.embedding_cache.unknown_challenge",
                    challenge_id = challenge_id
                );
            }
            Err(e) => {
                tracing::warn!(
                    event = "promptle.embedding_cache.read_failed",
                    challenge_id = challenge_id,
                    error = %e
                );
            }
        }

        tracing::info!(
            event = "promptle.embedding_cache.miss",
            challenge_id = challenge_id,
            model = self.embedder.model_id()
        );

        let vector = bounded(
            self.timeouts.embedding(),
            "embed_image",
            self.embedder.embed_image(image_url),
        )
        .await
        .map_err(EmbeddingError::Unavailable)?;
        validate_vector(&vector, self.expected_dims)?;

        // Persisting is an optimisation; the computed vector is returned either way.
        if let Err(e) = bounded(
            self.timeouts.storage(),
            "embedding_write",
            self.store.set_embedding(challenge_id, &vector),
        )
        .await
        {
            tracing::warn!(
                event = "promptle.embedding_cache.persist_failed",
                challenge_id = challenge_id,
                error = %e
            );
        }

        Ok(TargetEmbedding {
            vector,
            hit: false,
        })
    }

    /// Embeds a player's input (prompt text or generated image) without caching.
    pub async fn embed_candidate(&self, input: Candidate<'_>) -> Result<Vec<f32>, EmbeddingError> {
        let vector = match input {
            Candidate::Text(text) => {
                bounded(
                    self.timeouts.embedding(),
                    "embed_text",
                    self.embedder.embed_text(text),
                )
                .await
            }
            Candidate::Image(url) => {
                bounded(
                    self.timeouts.embedding(),
                    "embed_image",
                    self.embedder.embed_image(url),
                )
                .await
            }
        }
        .map_err(EmbeddingError::Unavailable)?;
        validate_vector(&vector, self.expected_dims)?;
        Ok(vector)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Text(&'a str),
    Image(&'a str),
}
