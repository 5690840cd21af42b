mod config;
mod controller;
mod gateway;
mod report;

// Public API of the quiz session subsystem.
pub use config::SessionConfig;
pub use controller::{
    SessionCollaborators, SessionController, SessionHandle, SessionSnapshot, UserIntent,
};
pub use report::{OutcomeStatus, SessionReport, Termination};
