//! Shape checks for upstream payloads and accessors over [`FetchOutcome`].
//!
//! The upstream success and error bodies share no discriminant besides a
//! numeric `code`, so a payload counts as a success only when it is a mapping
//! carrying a `data` array whose elements decode as [`NewsItem`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::ResponseError,
    models::{FetchOutcome, NewsItem, NewsPage, Pagination},
};

pub fn is_success(outcome: &FetchOutcome) -> bool {
    outcome.is_success()
}

/// Items of a successful outcome in upstream order; empty for a failure.
pub fn items_of(outcome: &FetchOutcome) -> &[NewsItem] {
    outcome.items()
}

/// Decodes a 2xx body into a [`NewsPage`].
pub fn check_payload(mut body: Value) -> Result<NewsPage, ResponseError> {
    let Some(object) = body.as_object_mut() else {
        return Err(ResponseError::invalid_shape("payload is not a JSON object"));
    };

    let data = match object.remove("data") {
        Some(data @ Value::Array(_)) => data,
        Some(_) => return Err(ResponseError::invalid_shape("`data` is not an array")),
        None => return Err(ResponseError::invalid_shape("missing `data` array")),
    };

    let items: Vec<NewsItem> = serde_json::from_value(data)
        .map_err(|e| ResponseError::invalid_shape(format!("undecodable news item: {e}")))?;

    let pagination = match object.remove("pagination") {
        None | Some(Value::Null) => Pagination::single_page(items.len()),
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed pagination block: {}", e);
            Pagination::single_page(items.len())
        }),
    };

    debug!(
        items = items.len(),
        page = pagination.page,
        total = pagination.total,
        "Decoded news payload"
    );

    Ok(NewsPage { items, pagination })
}

/// Extracts the upstream error text from an error body. The field name is
/// not fixed: `error` is preferred, then `message`.
pub fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
}
