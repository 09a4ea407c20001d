use async_trait::async_trait;

pub mod fake;
pub mod http;

/// Remote embedding model shared by image and text inputs.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_image(&self, image_url: &str) -> anyhow::Result<Vec<f32>>;
    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn model_id(&self) -> &str;
}
