use super::ImageGenerator;
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_MODEL: &str = "fal-ai/flux/dev";

pub struct FalImageGenerator {
    pub model: String,
    pub api_key: String,
    pub client: reqwest::Client,
}

impl FalImageGenerator {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageGenerator for FalImageGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("https://fal.run/{}", self.model);

        let body = json!({
            "prompt": prompt,
            "image_size": "square_hd",
            "num_inference_steps": 28,
            "num_images": 1,
            "enable_safety_checker": true,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("fal.ai API error {}: {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;

        let image_url = json
            .pointer("/images/0/url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("fal.ai response missing images[0].url"))?
            .to_string();

        if let Some(t) = json.pointer("/timings/inference").and_then(|v| v.as_f64()) {
            tracing::debug!(event = "promptle.generate.timing", inference_s = t);
        }

        Ok(image_url)
    }

    fn provider_name(&self) -> &'static str {
        "fal"
    }
}
