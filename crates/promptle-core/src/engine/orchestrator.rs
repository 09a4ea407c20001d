use crate::attempts::{attempts_left_message, exhausted_message, AttemptGate, AttemptStatus};
use crate::embeddings::cache::{Candidate, EmbeddingCache};
use crate::engine::state::AttemptStage;
use crate::errors::{FailureKind, GateError};
use crate::ledger::GuessLedger;
use crate::model::{
    AttemptFailure, AttemptSuccess, Challenge, Guess, NewGuess, Outcome, ScoringMode,
    MAX_ATTEMPTS, MAX_PROMPT_CHARS,
};
use crate::providers::embedder::Embedder;
use crate::providers::imagegen::ImageGenerator;
use crate::redaction::prompt_digest;
use crate::similarity;
use crate::storage::{ChallengeStore, GuessStore};
use crate::timeouts::{bounded, Timeouts};
use chrono::NaiveDate;
use std::sync::Arc;

/// Handles to every external collaborator, constructed by the caller.
#[derive(Clone)]
pub struct Collaborators {
    pub challenges: Arc<dyn ChallengeStore>,
    pub guesses: Arc<dyn GuessStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Option<Arc<dyn ImageGenerator>>,
}

/// Runs one submission through validation, gating, optional generation,
/// scoring and persistence. Holds no per-request state, so concurrent
/// submissions only meet in the stores.
#[derive(Clone)]
pub struct AttemptOrchestrator {
    gate: AttemptGate,
    cache: EmbeddingCache,
    ledger: GuessLedger,
    challenges: Arc<dyn ChallengeStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
    mode: ScoringMode,
    timeouts: Timeouts,
}

impl AttemptOrchestrator {
    pub fn new(
        parts: Collaborators,
        mode: ScoringMode,
        timeouts: Timeouts,
        expected_dims: Option<usize>,
    ) -> anyhow::Result<Self> {
        if mode.needs_generator() && parts.generator.is_none() {
            anyhow::bail!("config error: generated_image_embedding scoring requires an image generator");
        }
        Ok(Self {
            gate: AttemptGate::new(parts.guesses.clone(), timeouts),
            cache: EmbeddingCache::new(
                parts.challenges.clone(),
                parts.embedder,
                timeouts,
                expected_dims,
            ),
            ledger: GuessLedger::new(parts.guesses, timeouts),
            challenges: parts.challenges,
            generator: parts.generator,
            mode,
            timeouts,
        })
    }

    pub fn scoring_mode(&self) -> ScoringMode {
        self.mode
    }

    pub async fn submit_attempt(
        &self,
        user_id: Option<&str>,
        challenge_id: &str,
        prompt: &str,
    ) -> Outcome {
        let mut run = Run::new(challenge_id);

        let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) else {
            return run.fail(AttemptFailure::new(
                FailureKind::Unauthenticated,
                "You must be logged in to submit a guess",
            ));
        };

        run.enter(AttemptStage::Validating);
        if let Err(msg) = validate_prompt(prompt) {
            return run.fail(AttemptFailure::new(FailureKind::InvalidPrompt, msg));
        }

        run.enter(AttemptStage::Gating);
        let status = match self.gate.status(user_id, challenge_id).await {
            Ok(s) => s,
            Err(e) => {
                run.cause(&e);
                return run.fail(AttemptFailure::new(
                    e.kind(),
                    "Failed to check attempts. Please try again.",
                ));
            }
        };
        if status.is_exhausted() {
            return run.fail(AttemptFailure {
                attempts_left: Some(status.remaining()),
                ..AttemptFailure::new(FailureKind::AttemptsExhausted, exhausted_message())
            });
        }
        let attempt_number = status.next_attempt_number;

        let challenge = match self.load_challenge(challenge_id).await {
            Ok(c) => c,
            Err(e) => {
                run.cause(&e);
                return run.fail(AttemptFailure::new(
                    FailureKind::ChallengeUnavailable,
                    "Failed to load challenge. Please try again.",
                ));
            }
        };

        let generated = match (&self.mode, &self.generator) {
            (ScoringMode::GeneratedImageEmbedding, Some(generator)) => {
                run.enter(AttemptStage::Generating);
                match bounded(
                    self.timeouts.generation(),
                    "generate_image",
                    generator.generate(prompt),
                )
                .await
                {
                    Ok(url) if !url.trim().is_empty() => Some(url),
                    Ok(_) => {
                        run.cause(&"generator returned an empty url");
                        return run.fail(AttemptFailure::new(
                            FailureKind::GenerationFailed,
                            "Failed to generate image. Please try again.",
                        ));
                    }
                    Err(e) => {
                        run.cause(&e);
                        return run.fail(AttemptFailure::new(
                            FailureKind::GenerationFailed,
                            "Failed to generate image. Please try again.",
                        ));
                    }
                }
            }
            _ => None,
        };

        run.enter(AttemptStage::Scoring);
        let score = match self.score(&challenge, prompt, generated.as_deref()).await {
            Ok(s) => s,
            Err((kind, e)) => {
                tracing::warn!(
                    event = "promptle.attempt.scoring_failed",
                    challenge_id = challenge_id,
                    cause_kind = %kind,
                    error = %e
                );
                return run.fail(
                    AttemptFailure::new(
                        FailureKind::ScoringFailed,
                        "Failed to calculate similarity score. Please try again.",
                    )
                    .with_image(generated),
                );
            }
        };

        run.enter(AttemptStage::Persisting);
        let new_guess = NewGuess {
            user_id: user_id.to_string(),
            challenge_id: challenge_id.to_string(),
            prompt: prompt.to_string(),
            generated_image_url: generated.clone(),
            score: f64::from(score),
            attempt_number,
        };
        let saved = match self.ledger.save(&new_guess).await {
            Ok(g) => g,
            Err(e) => {
                run.cause(&e);
                let failure = if e.is_conflict() {
                    AttemptFailure {
                        conflict: true,
                        ..AttemptFailure::new(
                            e.kind(),
                            "Another submission took this attempt first. Please try again.",
                        )
                    }
                } else {
                    AttemptFailure::new(e.kind(), "Failed to save your guess. Please try again.")
                };
                return run.fail(failure.with_image(generated));
            }
        };

        run.enter(AttemptStage::Done);
        let attempts_left = MAX_ATTEMPTS - saved.attempt_number;
        tracing::info!(
            event = "promptle.attempt.done",
            challenge_id = challenge_id,
            guess_id = saved.id,
            attempt_number = saved.attempt_number,
            score = score,
            prompt_sha = %prompt_digest(prompt),
            mode = ?self.mode
        );

        Outcome::Success(AttemptSuccess {
            image_url: saved.generated_image_url,
            score,
            attempt_number: saved.attempt_number,
            attempts_left,
            message: attempts_left_message(attempts_left),
        })
    }

    /// The player's guesses for a challenge, in attempt order.
    pub async fn list_attempts(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Vec<Guess>> {
        self.ledger.list_by_user(user_id, challenge_id).await
    }

    pub async fn best_score(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Option<f64>> {
        self.ledger.best_score(user_id, challenge_id).await
    }

    pub async fn attempt_status(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<AttemptStatus, GateError> {
        self.gate.status(user_id, challenge_id).await
    }

    /// The challenge scheduled for `today` (UTC calendar day), if any.
    pub async fn todays_challenge(&self, today: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        bounded(
            self.timeouts.storage(),
            "challenge_by_date",
            self.challenges.challenge_for_date(today),
        )
        .await
    }

    async fn load_challenge(&self, challenge_id: &str) -> anyhow::Result<Challenge> {
        let challenge = bounded(
            self.timeouts.storage(),
            "challenge_read",
            self.challenges.get_challenge(challenge_id),
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("challenge {} not found", challenge_id))?;
        if challenge.image_url.trim().is_empty() {
            anyhow::bail!("challenge {} has no image", challenge_id);
        }
        Ok(challenge)
    }

    async fn score(
        &self,
        challenge: &Challenge,
        prompt: &str,
        generated: Option<&str>,
    ) -> Result<u8, (FailureKind, anyhow::Error)> {
        let target = self
            .cache
            .get_or_compute(&challenge.id, &challenge.image_url)
            .await
            .map_err(|e| (e.kind(), anyhow::Error::new(e)))?;
        tracing::debug!(
            event = "promptle.attempt.target_embedding",
            challenge_id = %challenge.id,
            cache_hit = target.hit,
            dims = target.vector.len()
        );

        let candidate = match generated {
            Some(url) => Candidate::Image(url),
            None => Candidate::Text(prompt),
        };
        let candidate = self
            .cache
            .embed_candidate(candidate)
            .await
            .map_err(|e| (e.kind(), anyhow::Error::new(e)))?;

        similarity::score(&target.vector, &candidate).map_err(|e| (e.kind(), anyhow::Error::new(e)))
    }
}

/// Checks the 1..=100 character rule. Whitespace-only prompts count as empty.
pub fn validate_prompt(prompt: &str) -> Result<(), String> {
    if prompt.trim().is_empty() {
        return Err("Prompt cannot be empty".to_string());
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(format!(
            "Prompt must be between 1 and {} characters",
            MAX_PROMPT_CHARS
        ));
    }
    Ok(())
}

/// Stage bookkeeping and logging for one submission.
struct Run<'a> {
    stage: AttemptStage,
    challenge_id: &'a str,
}

impl<'a> Run<'a> {
    fn new(challenge_id: &'a str) -> Self {
        Self {
            stage: AttemptStage::Authenticating,
            challenge_id,
        }
    }

    fn enter(&mut self, next: AttemptStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        tracing::debug!(
            event = "promptle.attempt.stage",
            challenge_id = self.challenge_id,
            from = self.stage.name(),
            to = next.name()
        );
        self.stage = next;
    }

    fn cause(&self, e: &dyn std::fmt::Display) {
        tracing::warn!(
            event = "promptle.attempt.step_error",
            challenge_id = self.challenge_id,
            stage = self.stage.name(),
            error = %e
        );
    }

    fn fail(&mut self, failure: AttemptFailure) -> Outcome {
        let at = self.stage;
        self.enter(AttemptStage::Failed(failure.kind));
        if failure.kind.is_informational() {
            tracing::info!(
                event = "promptle.attempt.exhausted",
                challenge_id = self.challenge_id
            );
        } else {
            tracing::warn!(
                event = "promptle.attempt.failed",
                challenge_id = self.challenge_id,
                stage = at.name(),
                kind = %failure.kind,
                conflict = failure.conflict
            );
        }
        Outcome::Failure(failure)
    }
}
