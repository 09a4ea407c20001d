#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use promptle_core::engine::{AttemptOrchestrator, Collaborators};
use promptle_core::errors::LedgerError;
use promptle_core::model::{Challenge, Guess, NewChallenge, NewGuess, ScoringMode};
use promptle_core::providers::embedder::Embedder;
use promptle_core::providers::imagegen::ImageGenerator;
use promptle_core::storage::{ChallengeStore, GuessStore, Store};
use promptle_core::timeouts::Timeouts;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const C1_IMAGE: &str = "https://images.example/c1.jpg";

pub fn store_with_challenge(embedding: Option<&[f32]>) -> anyhow::Result<Store> {
    let store = Store::memory()?;
    store.init_schema()?;
    store.put_challenge(&NewChallenge {
        id: "C1".into(),
        date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        image_url: C1_IMAGE.into(),
        photographer_name: Some("Jo Lens".into()),
        photographer_url: Some("https://photos.example/jo".into()),
    })?;
    if let Some(v) = embedding {
        store.put_embedding("C1", v)?;
    }
    Ok(store)
}

/// Embedder answering from fixed tables and counting every call.
#[derive(Default)]
pub struct ScriptedEmbedder {
    pub images: HashMap<String, Vec<f32>>,
    pub texts: HashMap<String, Vec<f32>>,
    pub image_calls: Mutex<HashMap<String, usize>>,
    pub text_calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(mut self, url: &str, v: &[f32]) -> Self {
        self.images.insert(url.to_string(), v.to_vec());
        self
    }

    pub fn text(mut self, prompt: &str, v: &[f32]) -> Self {
        self.texts.insert(prompt.to_string(), v.to_vec());
        self
    }

    pub fn delayed(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    pub fn image_calls_for(&self, url: &str) -> usize {
        self.image_calls
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        let images: usize = self.image_calls.lock().unwrap().values().sum();
        images + self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed_image(&self, image_url: &str) -> anyhow::Result<Vec<f32>> {
        *self
            .image_calls
            .lock()
            .unwrap()
            .entry(image_url.to_string())
            .or_default() += 1;
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.images
            .get(image_url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no image embedding scripted for {}", image_url))
    }

    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.texts
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no text embedding scripted for {:?}", text))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Generator mapping each prompt to `https://gen.example/<n>.png`, or failing.
pub struct StubGenerator {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubGenerator {
    pub fn ok() -> Self {
        Self {
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn slow(d: Duration) -> Self {
        Self {
            delay: Some(d),
            ..Self::ok()
        }
    }

    pub fn url_for(n: usize) -> String {
        format!("https://gen.example/{}.png", n)
    }
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            anyhow::bail!("upstream 503");
        }
        Ok(Self::url_for(n))
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// Guess store whose count always reads zero, as if a concurrent submission's
/// insert was not yet visible when the gate ran.
pub struct StaleCount(pub Store);

#[async_trait]
impl GuessStore for StaleCount {
    async fn insert_guess(&self, guess: &NewGuess) -> Result<Guess, LedgerError> {
        self.0.insert_guess(guess).await
    }
    async fn count_guesses(&self, _u: &str, _c: &str) -> anyhow::Result<u32> {
        Ok(0)
    }
    async fn list_guesses(&self, u: &str, c: &str) -> anyhow::Result<Vec<Guess>> {
        self.0.list_guesses(u, c).await
    }
    async fn max_score(&self, u: &str, c: &str) -> anyhow::Result<Option<f64>> {
        self.0.max_score(u, c).await
    }
}

/// Guess store that fails every operation.
pub struct DownGuesses;

#[async_trait]
impl GuessStore for DownGuesses {
    async fn insert_guess(&self, _g: &NewGuess) -> Result<Guess, LedgerError> {
        Err(LedgerError::Storage(anyhow::anyhow!("disk I/O error")))
    }
    async fn count_guesses(&self, _u: &str, _c: &str) -> anyhow::Result<u32> {
        anyhow::bail!("disk I/O error")
    }
    async fn list_guesses(&self, _u: &str, _c: &str) -> anyhow::Result<Vec<Guess>> {
        anyhow::bail!("disk I/O error")
    }
    async fn max_score(&self, _u: &str, _c: &str) -> anyhow::Result<Option<f64>> {
        anyhow::bail!("disk I/O error")
    }
}

/// Counts guesses correctly but refuses every insert.
pub struct ReadOnlyGuesses(pub Store);

#[async_trait]
impl GuessStore for ReadOnlyGuesses {
    async fn insert_guess(&self, _g: &NewGuess) -> Result<Guess, LedgerError> {
        Err(LedgerError::Storage(anyhow::anyhow!("attempt to write a readonly database")))
    }
    async fn count_guesses(&self, u: &str, c: &str) -> anyhow::Result<u32> {
        self.0.count_guesses(u, c).await
    }
    async fn list_guesses(&self, u: &str, c: &str) -> anyhow::Result<Vec<Guess>> {
        self.0.list_guesses(u, c).await
    }
    async fn max_score(&self, u: &str, c: &str) -> anyhow::Result<Option<f64>> {
        self.0.max_score(u, c).await
    }
}

/// Challenge store that reads normally but cannot persist embeddings.
pub struct NoEmbeddingWrites(pub Store);

#[async_trait]
impl ChallengeStore for NoEmbeddingWrites {
    async fn get_challenge(&self, id: &str) -> anyhow::Result<Option<Challenge>> {
        self.0.get_challenge(id).await
    }
    async fn set_embedding(&self, _id: &str, _embedding: &[f32]) -> anyhow::Result<()> {
        anyhow::bail!("permission denied for table challenges")
    }
    async fn insert_challenge(&self, c: &NewChallenge) -> anyhow::Result<Challenge> {
        self.0.insert_challenge(c).await
    }
    async fn challenge_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        self.0.challenge_for_date(date).await
    }
}

pub fn orchestrator(
    store: &Store,
    embedder: Arc<ScriptedEmbedder>,
    generator: Option<Arc<StubGenerator>>,
    mode: ScoringMode,
) -> AttemptOrchestrator {
    orchestrator_with(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        embedder,
        generator,
        mode,
        Timeouts::default(),
    )
}

pub fn orchestrator_with(
    challenges: Arc<dyn ChallengeStore>,
    guesses: Arc<dyn GuessStore>,
    embedder: Arc<ScriptedEmbedder>,
    generator: Option<Arc<StubGenerator>>,
    mode: ScoringMode,
    timeouts: Timeouts,
) -> AttemptOrchestrator {
    let generator = generator.map(|g| g as Arc<dyn ImageGenerator>);
    AttemptOrchestrator::new(
        Collaborators {
            challenges,
            guesses,
            embedder,
            generator,
        },
        mode,
        timeouts,
        None,
    )
    .expect("valid orchestrator")
}
