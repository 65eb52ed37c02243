use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::{NewsItem, Pagination};
use crate::error::{ResponseError, TransportError};

/// Fixed code for shape errors and exhausted retries.
pub const INTERNAL_ERROR_CODE: u16 = 500;
/// Code reported when the caller cancels a fetch.
pub const CANCELLED_CODE: u16 = 499;

pub const INVALID_SHAPE_MESSAGE: &str = "invalid response shape";
pub const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";
pub const CANCELLED_MESSAGE: &str = "request cancelled";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsPage {
    pub items: Vec<NewsItem>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Deserialize, Serialize)]
#[display("[{code}] {message} ({request_path})")]
pub struct FetchFailure {
    pub code: u16,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub request_path: String,
}

impl FetchFailure {
    pub fn new(code: u16, message: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            occurred_at: Utc::now(),
            request_path: request_path.into(),
        }
    }

    pub(crate) fn from_response(err: &ResponseError, request_path: &str) -> Self {
        match err {
            ResponseError::HttpStatus { status, message } => {
                Self::new(status.as_u16(), message.clone(), request_path)
            }
            ResponseError::InvalidShape(_) => {
                Self::new(INTERNAL_ERROR_CODE, INVALID_SHAPE_MESSAGE, request_path)
            }
        }
    }

    pub(crate) fn exhausted(last: Option<&TransportError>, request_path: &str) -> Self {
        let message = last.map_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string(), |e| e.to_string());
        Self::new(INTERNAL_ERROR_CODE, message, request_path)
    }

    pub(crate) fn cancelled(request_path: &str) -> Self {
        Self::new(CANCELLED_CODE, CANCELLED_MESSAGE, request_path)
    }
}

/// Result of one logical fetch. Every terminal state of the client is one of
/// these two variants; callers must check the tag before reading items.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    Success(NewsPage),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn items(&self) -> &[NewsItem] {
        match self {
            Self::Success(page) => &page.items,
            Self::Failure(_) => &[],
        }
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        match self {
            Self::Success(page) => Some(&page.pagination),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<NewsPage, FetchFailure> {
        match self {
            Self::Success(page) => Ok(page),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl From<NewsPage> for FetchOutcome {
    fn from(page: NewsPage) -> Self {
        Self::Success(page)
    }
}

impl From<FetchFailure> for FetchOutcome {
    fn from(failure: FetchFailure) -> Self {
        Self::Failure(failure)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_failure_keeps_upstream_code_and_message() {
        let err = ResponseError::http_status(StatusCode::NOT_FOUND, "no such category");
        let failure = FetchFailure::from_response(&err, "/api/news?category=99");

        assert_eq!(failure.code, 404);
        assert_eq!(failure.message, "no such category");
        assert_eq!(failure.request_path, "/api/news?category=99");
        assert_eq!(
            failure.to_string(),
            "[404] no such category (/api/news?category=99)"
        );
    }

    #[test]
    fn shape_failure_hides_details() {
        let err = ResponseError::invalid_shape("missing `data` array");
        let failure = FetchFailure::from_response(&err, "/api/news");

        assert_eq!(failure.code, INTERNAL_ERROR_CODE);
        assert_eq!(failure.message, INVALID_SHAPE_MESSAGE);
    }

    #[test]
    fn exhausted_without_error_is_unknown() {
        let failure = FetchFailure::exhausted(None, "/api/news");
        assert_eq!(failure.code, 500);
        assert_eq!(failure.message, UNKNOWN_ERROR_MESSAGE);

        let err = TransportError::connection("connection refused");
        let failure = FetchFailure::exhausted(Some(&err), "/api/news");
        assert_eq!(failure.message, "Connection error: connection refused");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = FetchOutcome::Success(NewsPage {
            items: Vec::new(),
            pagination: Pagination::single_page(0),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");

        let outcome: FetchOutcome = FetchFailure::new(503, "busy", "/api/news").into();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["code"], 503);
        assert!(outcome.items().is_empty());
        assert!(outcome.pagination().is_none());
    }
}
