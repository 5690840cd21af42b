#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod feedback;
pub mod http;
pub mod platform;
pub mod quiz;

pub use quiz_core::Clock;

pub use backend::{AnswerValidator, InMemoryBackend, OutcomeSource, QuestionSource};
pub use error::{ApiConfigError, BackendError, LoadError, OutcomeError, ValidationError};
pub use feedback::FeedbackAnimator;
pub use http::{ApiConfig, HttpBackend};
pub use platform::{Haptics, Navigator, Notice, Notifier, Route};
pub use quiz::{
    OutcomeStatus, SessionCollaborators, SessionConfig, SessionController, SessionHandle,
    SessionReport, SessionSnapshot, Termination, UserIntent,
};
