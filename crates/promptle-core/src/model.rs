use crate::errors::FailureKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of scored guesses per user per challenge.
pub const MAX_ATTEMPTS: u32 = 3;

/// Maximum prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub date: NaiveDate,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_url: Option<String>,
}

impl Challenge {
    /// The stored target embedding, if it has been populated.
    pub fn cached_embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub id: String,
    pub date: NaiveDate,
    pub image_url: String,
    pub photographer_name: Option<String>,
    pub photographer_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub id: i64,
    pub user_id: String,
    pub challenge_id: String,
    pub prompt: String,
    pub generated_image_url: Option<String>,
    pub score: f64,
    pub attempt_number: u32,
    pub created_at: DateTime<Utc>,
}

/// A guess before the ledger assigns its identifier and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGuess {
    pub user_id: String,
    pub challenge_id: String,
    pub prompt: String,
    pub generated_image_url: Option<String>,
    pub score: f64,
    pub attempt_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Embed the prompt text and compare it to the target image.
    #[default]
    DirectPromptEmbedding,
    /// Generate an image from the prompt and compare the two images.
    GeneratedImageEmbedding,
}

impl ScoringMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "direct_prompt_embedding" | "direct" => Some(Self::DirectPromptEmbedding),
            "generated_image_embedding" | "generated" => Some(Self::GeneratedImageEmbedding),
            _ => None,
        }
    }

    pub fn needs_generator(&self) -> bool {
        matches!(self, Self::GeneratedImageEmbedding)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSuccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub score: u8,
    pub attempt_number: u32,
    pub attempts_left: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Only set when the failure is `AttemptsExhausted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
    /// Generated image that could not be scored or stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// The attempt number was taken by a concurrent submission; resubmitting is safe.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub conflict: bool,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts_left: None,
            image_url: None,
            conflict: false,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Outcome {
    Success(AttemptSuccess),
    Failure(AttemptFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(f) => Some(f.kind),
        }
    }

    pub fn attempts_left(&self) -> Option<u32> {
        match self {
            Outcome::Success(s) => Some(s.attempts_left),
            Outcome::Failure(f) => f.attempts_left,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(s) => &s.message,
            Outcome::Failure(f) => &f.message,
        }
    }
}
