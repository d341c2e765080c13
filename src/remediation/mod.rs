//! The bounded commit / build / fix loop and the code agent it drives.

mod agent;
mod orchestrator;
mod prompt;

pub use agent::{CodeAgent, CommandAgent};
pub use orchestrator::{
    DEFAULT_MAX_FIX_ROUNDS, DEFAULT_ROLE, RemediationConfig, Remediator, Stage,
};
pub use prompt::FixRequest;
