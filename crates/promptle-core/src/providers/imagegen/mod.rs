use async_trait::async_trait;

pub mod fake;
pub mod fal;

/// Text-to-image service. Fails coarsely; there are no partial results.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}
