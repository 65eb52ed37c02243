use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Contract and configuration violations. Upstream and network conditions
/// never surface as a `ClientError`; they become a
/// [`FetchOutcome::Failure`](crate::models::FetchOutcome::Failure).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("HTTP client construction failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ClientError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn config(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            key,
            reason: reason.into(),
        }
    }
}

/// Failures that happen before or during the HTTP exchange. These are the
/// only failures that are retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl TransportError {
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection(reason.into())
    }
}

/// Failures reported by, or decoded from, a reachable upstream. Terminal.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: StatusCode, message: String },

    #[error("Unexpected response structure: {0}")]
    InvalidShape(String),
}

impl ResponseError {
    pub fn http_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_shape(description: impl Into<String>) -> Self {
        Self::InvalidShape(description.into())
    }
}
