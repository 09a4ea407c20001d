use super::Embedder;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Offline embedder: each input maps to a fixed pseudo-random vector derived
/// from its SHA-256 digest. Equal inputs always embed identically.
pub struct FakeEmbedder {
    dims: usize,
}

impl FakeEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn vector(&self, domain: &str, input: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dims);
        let mut block = 0u32;
        while out.len() < self.dims {
            let mut h = Sha256::new();
            h.update(domain.as_bytes());
            h.update(b"\n");
            h.update(input.as_bytes());
            h.update(block.to_le_bytes());
            for byte in h.finalize() {
                if out.len() == self.dims {
                    break;
                }
                out.push(byte as f32 / 127.5 - 1.0);
            }
            block += 1;
        }
        out
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_image(&self, image_url: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.vector("image", image_url))
    }

    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.vector("text", text))
    }

    fn model_id(&self) -> &str {
        "fake"
    }
}
