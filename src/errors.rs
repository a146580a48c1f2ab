use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::error;

pub const REDEEM_MESSAGE: &str = "No attempts left. Redeem your discount in the store to keep playing.";

const GENERIC_FAILURE: &str = "Something went wrong, please try again";

/// Failures of the persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("data file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("data file encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),

    #[error("a user with this phone number is already registered")]
    AlreadyRegistered,

    #[error("user not found")]
    UserNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("session was closed")]
    SessionClosed,

    #[error("start the timer first")]
    TimerStopped,

    #[error("previous attempt is still being recorded")]
    AttemptInFlight,

    #[error("too fast, wait a moment before pressing again")]
    Cooldown,

    #[error("{}", REDEEM_MESSAGE)]
    AttemptsExhausted,

    #[error("admin token required")]
    Unauthorized,

    #[error("wrong password")]
    WrongPassword,

    #[error("too many failed logins, locked until {}", .until.to_rfc3339())]
    AdminLocked { until: DateTime<Utc> },

    #[error("admin login is not configured")]
    AdminDisabled,

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        error!("request failed: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        let status = match err {
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::SessionNotFound | GameError::Unauthorized | GameError::WrongPassword => {
                StatusCode::UNAUTHORIZED
            }
            GameError::UserNotFound => StatusCode::NOT_FOUND,
            GameError::AlreadyRegistered
            | GameError::SessionClosed
            | GameError::TimerStopped
            | GameError::AttemptInFlight => StatusCode::CONFLICT,
            GameError::Cooldown => StatusCode::TOO_MANY_REQUESTS,
            GameError::AttemptsExhausted => StatusCode::FORBIDDEN,
            GameError::AdminLocked { .. } => StatusCode::LOCKED,
            GameError::AdminDisabled => StatusCode::SERVICE_UNAVAILABLE,
            GameError::Export(_) | GameError::Store(_) => return Self::internal(err),
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
