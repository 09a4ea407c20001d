use crate::errors::LedgerError;
use crate::model::{Challenge, Guess, NewChallenge, NewGuess};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod schema;
pub mod store;

pub use store::Store;

/// Read and cache-fill access to challenges.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn get_challenge(&self, id: &str) -> anyhow::Result<Option<Challenge>>;

    /// Stores the target embedding. Concurrent writers overwrite each other;
    /// every writer holds an equivalent vector.
    async fn set_embedding(&self, id: &str, embedding: &[f32]) -> anyhow::Result<()>;

    async fn insert_challenge(&self, challenge: &NewChallenge) -> anyhow::Result<Challenge>;

    async fn challenge_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>>;
}

/// Append-only guess storage.
#[async_trait]
pub trait GuessStore: Send + Sync {
    /// Fails with `LedgerError::Conflict` when the attempt number is already
    /// taken for the user and challenge.
    async fn insert_guess(&self, guess: &NewGuess) -> Result<Guess, LedgerError>;

    async fn count_guesses(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<u32>;

    async fn list_guesses(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Vec<Guess>>;

    async fn max_score(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Option<f64>>;
}
