use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{timeout, Duration};

/// Upper bounds for each class of external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub storage_ms: u64,
    pub generation_ms: u64,
    pub embedding_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            storage_ms: 5_000,
            generation_ms: 60_000,
            embedding_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn storage(&self) -> Duration {
        Duration::from_millis(self.storage_ms)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_millis(self.generation_ms)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }
}

/// Runs `fut` under `limit`. A timeout becomes an ordinary error so callers
/// map it to the same failure kind as any transport error; only the log line
/// tells them apart.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                event = "promptle.external.timeout",
                op = op,
                timed_out = true,
                limit_ms = limit.as_millis() as u64,
                "{} timed out",
                op
            );
            anyhow::bail!("{} timed out after {}ms", op, limit.as_millis())
        }
    }
}
