//! # Error Handling
//!
//! Defines the application error type and its conversion to HTTP responses.
//! Every failure surfaces as a JSON body of the shape `{ "message": ... }`
//! with the matching status code:
//!
//! - `BadRequest` / `Validation` → 400
//! - `Unauthorized` → 401
//! - `NotFound` → 404
//! - `Internal` → 500 (database and upstream-service failures are logged
//!   and surfaced generically)

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::audio::AudioError;

#[derive(Debug)]
pub enum AppError {
    /// Server-side problems (database failures, upstream services, bugs)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Missing or invalid session token
    Unauthorized(String),

    /// Requested resource does not exist
    NotFound(String),

    /// User input failed validation rules
    Validation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                // Internal detail stays in the logs, not the response
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        HttpResponse::build(status).json(json!({ "message": message }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Internal(format!("configuration error: {}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(format!("database error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Internal(format!("upstream service error: {}", err))
    }
}

/// Undecodable uploads are the client's problem; render failures are ours.
impl From<AudioError> for AppError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Decode(msg) => {
                AppError::BadRequest(format!("unrecognized audio format: {}", msg))
            }
            AudioError::Render(msg) => AppError::Internal(format!("audio rendering: {}", msg)),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("x".into()).error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("x".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_audio_error_mapping() {
        let decode: AppError = AudioError::Decode("bad bytes".into()).into();
        assert!(matches!(decode, AppError::BadRequest(_)));

        let render: AppError = AudioError::Render("stage failed".into()).into();
        assert!(matches!(render, AppError::Internal(_)));
    }
}
