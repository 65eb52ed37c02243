use std::num::NonZeroU32;

use bon::Builder;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::{
    client::NewsClient,
    error::ClientError,
    http::HttpRequest,
    models::{FetchFailure, FetchOutcome},
    paths::{CATEGORY_PARAM, DATE_PARAM, PAGE_PARAM, PER_PAGE_PARAM},
};

/// Filters for one news query. Absent fields are not sent; the upstream
/// treats them as "no filter".
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct RequestSpec {
    #[builder(into)]
    pub category: Option<i64>,
    pub date: Option<NaiveDate>,
    pub page: Option<NonZeroU32>,
    pub per_page: Option<NonZeroU32>,
}

impl RequestSpec {
    pub fn parse_date(raw: &str) -> Result<NaiveDate, ClientError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| ClientError::invalid_request(format!("date '{raw}' is not YYYY-MM-DD: {e}")))
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(category) = self.category {
            pairs.push((CATEGORY_PARAM, category.to_string()));
        }
        if let Some(date) = self.date {
            pairs.push((DATE_PARAM, date.format("%Y-%m-%d").to_string()));
        }
        if let Some(page) = self.page {
            pairs.push((PAGE_PARAM, page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push((PER_PAGE_PARAM, per_page.to_string()));
        }
        pairs
    }
}

impl NewsClient {
    pub(crate) fn news_request(&self, spec: &RequestSpec) -> HttpRequest {
        HttpRequest::get(&self.base_url).queries(spec.query_pairs())
    }

    /// Fetches one page of news with the client's default attempt budget.
    pub async fn fetch(&self, spec: &RequestSpec) -> FetchOutcome {
        self.fetch_with_attempts(spec, self.retry.max_attempts).await
    }

    /// Fetches one page of news, retrying transport failures up to
    /// `max_attempts` attempts in total. A budget of 0 still makes one attempt.
    #[instrument(skip(self), fields(category = ?spec.category, date = ?spec.date))]
    pub async fn fetch_with_attempts(&self, spec: &RequestSpec, max_attempts: u32) -> FetchOutcome {
        let req = self.news_request(spec);
        self.execute(&req, max_attempts).await
    }

    /// Like [`fetch_with_attempts`](Self::fetch_with_attempts), but gives up
    /// as soon as `cancel` fires, aborting the in-flight attempt or backoff.
    #[instrument(skip(self, cancel), fields(category = ?spec.category, date = ?spec.date))]
    pub async fn fetch_cancellable(
        &self,
        spec: &RequestSpec,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let req = self.news_request(spec);

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("News request cancelled by caller");
                FetchFailure::cancelled(&req.path()).into()
            }
            outcome = self.execute(&req, max_attempts) => outcome,
        }
    }
}
