use super::Embedder;
use crate::embeddings::util::vec_from_json;
use async_trait::async_trait;
use serde_json::json;

/// Client for an embedding service exposing `/api/image-embedding` and
/// `/api/text-embedding`, both answering `{"embedding": [..]}`.
pub struct HttpEmbedder {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> anyhow::Result<Vec<f32>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("embedding service error {}: {}", status, error_text);
        }

        let payload: serde_json::Value = resp.json().await?;
        let embedding = payload
            .get("embedding")
            .ok_or_else(|| anyhow::anyhow!("embedding service response missing 'embedding'"))?;
        Ok(vec_from_json(embedding)?)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_image(&self, image_url: &str) -> anyhow::Result<Vec<f32>> {
        self.post("/api/image-embedding", json!({ "image_url": image_url }))
            .await
    }

    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.post("/api/text-embedding", json!({ "text": text })).await
    }

    fn model_id(&self) -> &str {
        "http"
    }
}
