use super::ImageGenerator;
use crate::redaction::prompt_digest;
use async_trait::async_trait;

/// Returns a stable `fake://image/<digest>` URL per prompt.
#[derive(Default)]
pub struct FakeImageGenerator;

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("fake://image/{}", prompt_digest(prompt)))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
