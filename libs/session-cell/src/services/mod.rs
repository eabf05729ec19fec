pub mod dialogue;
pub mod sessions;

pub use dialogue::{DialogueService, StepOutcome};
pub use sessions::SessionService;
