use axum::http::StatusCode;
use thiserror::Error;

use crate::models::Platform;

/// Failure reported by the remote data service (auth or table access).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Not signed in")]
    NoSession,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ServiceError {
    /// Message provided by the service itself, if it gave one.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            ServiceError::Api { message, .. } | ServiceError::NotFound(message)
                if !message.trim().is_empty() =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// User-visible text: the service's own message, or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.service_message().unwrap_or(fallback).to_string()
    }
}

/// Failure of a platform metrics fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0} API is not configured")]
    NotConfigured(Platform),

    #[error("content has no platform content id")]
    MissingContentId,

    #[error("no metrics found for '{0}'")]
    NotFound(String),

    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("{platform} API error ({status}): {message}")]
    Api {
        platform: Platform,
        status: u16,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

// Request URLs can carry credentials (YouTube passes its key as a query parameter).
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Request(err.without_url())
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    ProfileMissing(String),

    #[error("Error loading data: {0}")]
    DataLoad(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{0}")]
    Service(#[from] ServiceError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Auth(_) | TrackerError::ProfileMissing(_) | TrackerError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::DataLoad(_) | TrackerError::Service(_) => StatusCode::BAD_GATEWAY,
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
