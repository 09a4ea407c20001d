use crate::errors::LedgerError;
use crate::model::{Guess, NewGuess};
use crate::storage::GuessStore;
use crate::timeouts::{bounded, Timeouts};
use std::sync::Arc;

/// Durable, append-only record of scored guesses.
///
/// Reads always reflect the current stored state; call again to refresh.
#[derive(Clone)]
pub struct GuessLedger {
    store: Arc<dyn GuessStore>,
    timeouts: Timeouts,
}

impl GuessLedger {
    pub fn new(store: Arc<dyn GuessStore>, timeouts: Timeouts) -> Self {
        Self { store, timeouts }
    }

    /// Inserts `guess`. On success the row is stored and returned with its id
    /// and timestamp.
    ///
    /// A timeout abandons the blocking insert rather than cancelling it, so the
    /// row may still commit after `Storage` is reported. A retry then sees the
    /// updated count, or loses the unique check and gets `Conflict`; either
    /// way no attempt number is recorded twice.
    pub async fn save(&self, guess: &NewGuess) -> Result<Guess, LedgerError> {
        bounded(self.timeouts.storage(), "guess_insert", async {
            self.store.insert_guess(guess).await.map_err(anyhow::Error::new)
        })
        .await
        .map_err(|e| match e.downcast::<LedgerError>() {
            Ok(ledger) => ledger,
            Err(other) => LedgerError::Storage(other),
        })
    }

    /// Guesses in ascending attempt order.
    pub async fn list_by_user(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Vec<Guess>> {
        bounded(
            self.timeouts.storage(),
            "guess_list",
            self.store.list_guesses(user_id, challenge_id),
        )
        .await
    }

    pub async fn best_score(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Option<f64>> {
        bounded(
            self.timeouts.storage(),
            "guess_best",
            self.store.max_score(user_id, challenge_id),
        )
        .await
    }
}
