pub mod orchestrator;
pub mod state;

pub use orchestrator::{AttemptOrchestrator, Collaborators};
pub use state::AttemptStage;
