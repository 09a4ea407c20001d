use crate::errors::FailureKind;
use std::fmt;

/// Stages a single submission moves through. Any stage may fail directly;
/// `Done` and `Failed` are terminal and nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Authenticating,
    Validating,
    Gating,
    Generating,
    Scoring,
    Persisting,
    Done,
    Failed(FailureKind),
}

impl AttemptStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStage::Done | AttemptStage::Failed(_))
    }

    /// Whether `next` is a legal successor. Generating is skipped when the
    /// deployment scores prompt text directly.
    pub fn can_advance_to(&self, next: AttemptStage) -> bool {
        use AttemptStage::*;
        match (self, next) {
            (Done, _) | (Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Authenticating, Validating)
            | (Validating, Gating)
            | (Gating, Generating)
            | (Gating, Scoring)
            | (Generating, Scoring)
            | (Scoring, Persisting)
            | (Persisting, Done) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttemptStage::Authenticating => "authenticating",
            AttemptStage::Validating => "validating",
            AttemptStage::Gating => "gating",
            AttemptStage::Generating => "generating",
            AttemptStage::Scoring => "scoring",
            AttemptStage::Persisting => "persisting",
            AttemptStage::Done => "done",
            AttemptStage::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStage::Failed(kind) => write!(f, "failed({})", kind),
            other => f.write_str(other.name()),
        }
    }
}
