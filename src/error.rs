use axum::http::StatusCode;
use thiserror::Error;

use crate::controller::ResolveError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures raised while starting the service.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
}

/// Recoverable failure returned by a route handler.
///
/// The message is sent to the client as-is in the `error` field of the
/// 500 response body.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn internal(message: impl Into<String>) -> Self {
        HandlerError::Internal(message.into())
    }
}

/// Everything that can stop a request from producing a 200 envelope.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Route not found")]
    NotFound,

    #[error(transparent)]
    Unresolved(#[from] ResolveError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::Unresolved(_) | DispatchError::Handler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
