use crate::errors::GateError;
use crate::model::MAX_ATTEMPTS;
use crate::storage::GuessStore;
use crate::timeouts::{bounded, Timeouts};
use std::sync::Arc;

/// Where a user stands on a challenge before their next submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptStatus {
    pub count: u32,
    pub next_attempt_number: u32,
}

impl AttemptStatus {
    pub fn from_count(count: u32) -> Self {
        Self {
            count,
            next_attempt_number: count + 1,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_attempt_number > MAX_ATTEMPTS
    }

    pub fn remaining(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.count)
    }
}

/// Read-only view of how many guesses a user has recorded. Enforcing the
/// ceiling is left to the caller.
#[derive(Clone)]
pub struct AttemptGate {
    guesses: Arc<dyn GuessStore>,
    timeouts: Timeouts,
}

impl AttemptGate {
    pub fn new(guesses: Arc<dyn GuessStore>, timeouts: Timeouts) -> Self {
        Self { guesses, timeouts }
    }

    pub async fn status(&self, user_id: &str, challenge_id: &str) -> Result<AttemptStatus, GateError> {
        let count = bounded(
            self.timeouts.storage(),
            "guess_count",
            self.guesses.count_guesses(user_id, challenge_id),
        )
        .await
        .map_err(GateError::CountUnavailable)?;
        Ok(AttemptStatus::from_count(count))
    }
}

/// Player-facing message after a recorded attempt.
pub fn attempts_left_message(attempts_left: u32) -> String {
    match attempts_left {
        0 => "That was your last attempt! Check back tomorrow for a new challenge.".to_string(),
        1 => "Great attempt! You have 1 attempt left.".to_string(),
        n => format!("Great attempt! You have {} attempts left.", n),
    }
}

pub fn exhausted_message() -> String {
    format!(
        "You've used all {} attempts for today's challenge!",
        MAX_ATTEMPTS
    )
}
