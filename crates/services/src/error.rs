//! Shared error types for the services crate.
//!
//! Every collaborator call made by a session is converted into one of
//! `LoadError`, `ValidationError` or `OutcomeError`; nothing past the
//! controller sees a raw `BackendError`.

use thiserror::Error;
use tokio::task::JoinError;

/// Errors from a backend collaborator (HTTP or in-memory).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("backend rejected the session token")]
    Unauthorized,
    #[error("malformed backend payload: {0}")]
    Malformed(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The question set could not be fetched; the session cannot start.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("loading questions timed out")]
    TimedOut,
    #[error("loading questions did not complete: {0}")]
    Task(#[source] JoinError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// An answer could not be validated; the session treats it as incorrect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("answer validation timed out")]
    TimedOut,
    #[error("answer validation did not complete: {0}")]
    Task(#[source] JoinError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The final score/level could not be fetched; the session still ends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("fetching the session outcome timed out")]
    TimedOut,
    #[error("fetching the session outcome did not complete: {0}")]
    Task(#[source] JoinError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors building an `ApiConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiConfigError {
    #[error("invalid API base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid request timeout {raw:?}: expected milliseconds > 0")]
    InvalidTimeout { raw: String },
}
