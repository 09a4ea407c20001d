use serde::{Deserialize, Serialize};

/// Failure taxonomy reported to callers of the attempt pipeline.
///
/// `AttemptsExhausted` is informational: the caller has simply run out of
/// tries for the day. Every other kind is a "please try again" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthenticated,
    InvalidPrompt,
    CountUnavailable,
    AttemptsExhausted,
    ChallengeUnavailable,
    GenerationFailed,
    EmbeddingUnavailable,
    DimensionMismatch,
    ScoringFailed,
    PersistFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthenticated => "unauthenticated",
            FailureKind::InvalidPrompt => "invalid_prompt",
            FailureKind::CountUnavailable => "count_unavailable",
            FailureKind::AttemptsExhausted => "attempts_exhausted",
            FailureKind::ChallengeUnavailable => "challenge_unavailable",
            FailureKind::GenerationFailed => "generation_failed",
            FailureKind::EmbeddingUnavailable => "embedding_unavailable",
            FailureKind::DimensionMismatch => "dimension_mismatch",
            FailureKind::ScoringFailed => "scoring_failed",
            FailureKind::PersistFailed => "persist_failed",
        }
    }

    /// True for outcomes that are expected game states rather than faults.
    pub fn is_informational(&self) -> bool {
        matches!(self, FailureKind::AttemptsExhausted)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("attempt count unavailable: {0:#}")]
    CountUnavailable(anyhow::Error),
}

impl GateError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::CountUnavailable
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding service unavailable: {0:#}")]
    Unavailable(anyhow::Error),
    #[error("embedding service returned an invalid vector: {0}")]
    InvalidVector(String),
}

impl EmbeddingError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::EmbeddingUnavailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("embedding dims mismatch (a={a}, b={b})")]
    DimensionMismatch { a: usize, b: usize },
    #[error("cannot score empty embeddings")]
    EmptyVector,
}

impl ScoreError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScoreError::DimensionMismatch { .. } => FailureKind::DimensionMismatch,
            ScoreError::EmptyVector => FailureKind::EmbeddingUnavailable,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Another writer already recorded this attempt number.
    #[error("attempt {attempt_number} was already recorded for this user and challenge")]
    Conflict { attempt_number: u32 },
    #[error("guess storage failed: {0:#}")]
    Storage(anyhow::Error),
}

impl LedgerError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::PersistFailed
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);
