use std::collections::BTreeMap;

use chrono::NaiveDate;
use futures_concurrency::prelude::*;
use itertools::Itertools;
use tracing::{info, instrument};

use crate::{
    api::news::RequestSpec,
    client::NewsClient,
    models::{Category, FetchFailure, FetchOutcome, NewsItem},
};

/// One outcome per requested category, owned by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryDigest {
    outcomes: BTreeMap<Category, FetchOutcome>,
}

impl CategoryDigest {
    pub fn get(&self, category: Category) -> Option<&FetchOutcome> {
        self.outcomes.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &FetchOutcome)> {
        self.outcomes.iter().map(|(c, o)| (*c, o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (Category, &[NewsItem])> {
        self.iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(c, outcome)| (c, outcome.items()))
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &FetchFailure)> {
        self.iter()
            .filter_map(|(c, outcome)| outcome.failure().map(|f| (c, f)))
    }

    pub fn total_items(&self) -> usize {
        self.outcomes.values().map(|o| o.items().len()).sum()
    }

    /// Newest `n` items of each successful category, by `published_at`.
    pub fn latest(&self, n: usize) -> BTreeMap<Category, Vec<&NewsItem>> {
        self.successes()
            .map(|(category, items)| {
                let newest = items
                    .iter()
                    .sorted_by(|a, b| b.published_at.cmp(&a.published_at))
                    .take(n)
                    .collect();
                (category, newest)
            })
            .collect()
    }
}

impl FromIterator<(Category, FetchOutcome)> for CategoryDigest {
    fn from_iter<T: IntoIterator<Item = (Category, FetchOutcome)>>(iter: T) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl NewsClient {
    /// Fetches every catalog category concurrently.
    pub async fn fetch_all_categories(&self, date: Option<NaiveDate>) -> CategoryDigest {
        self.fetch_categories(Category::all(), date).await
    }

    /// One independent fetch per category, run concurrently and collected
    /// once all of them finish.
    #[instrument(skip(self, categories))]
    pub async fn fetch_categories<I>(&self, categories: I, date: Option<NaiveDate>) -> CategoryDigest
    where
        I: IntoIterator<Item = Category>,
    {
        let fetches: Vec<_> = categories
            .into_iter()
            .unique()
            .map(|category| async move {
                let spec = RequestSpec::builder()
                    .category(category)
                    .maybe_date(date)
                    .build();
                (category, self.fetch(&spec).await)
            })
            .collect();

        let digest: CategoryDigest = fetches.join().await.into_iter().collect();

        info!(
            categories = digest.len(),
            failed = digest.failures().count(),
            items = digest.total_items(),
            "Fetched category digest"
        );

        digest
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use reqwest::{StatusCode, Url};
    use serde_json::json;

    use super::*;
    use crate::{
        error::TransportError,
        http::{HttpRequest, RawResponse, Transport},
    };

    /// Answers by category: odd ids succeed with one item, `World` fails.
    struct ByCategory;

    #[async_trait]
    impl Transport for ByCategory {
        async fn send(&self, req: &HttpRequest) -> Result<RawResponse, TransportError> {
            let url = req.url();
            let category: i64 = url
                .query_pairs()
                .find(|(k, _)| k == "category")
                .and_then(|(_, v)| v.parse().ok())
                .ok_or_else(|| TransportError::connection("no category"))?;

            // Later categories answer sooner so completion order differs from request order.
            tokio::time::sleep(Duration::from_millis(100 * (9 - category as u64))).await;

            if category == Category::World.id() {
                let body = json!({ "code": 503, "error": "feed offline" });
                return Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, body.to_string()));
            }

            let date = url
                .query_pairs()
                .find(|(k, _)| k == "date")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_else(|| "2024-01-01".to_string());
            let data: Vec<_> = (0..category)
                .map(|i| {
                    json!({
                        "id": category * 100 + i,
                        "title": format!("story {i}"),
                        "content": "...",
                        "category_id": category,
                        "published_at": format!("{date}T0{i}:00:00Z"),
                        "source": "Desk",
                        "url": format!("https://news.example/{category}/{i}"),
                    })
                })
                .collect();
            let body = json!({ "code": 200, "data": data });
            Ok(RawResponse::new(StatusCode::OK, body.to_string()))
        }
    }

    fn client() -> NewsClient {
        NewsClient::builder()
            .base_url(Url::parse("http://news.local/api/news").unwrap())
            .transport(Arc::new(ByCategory))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_every_category_concurrently() {
        let started = tokio::time::Instant::now();

        let digest = client()
            .fetch_all_categories(NaiveDate::from_ymd_opt(2024, 6, 1))
            .await;

        assert_eq!(digest.len(), Category::all().len());
        assert_eq!(started.elapsed(), Duration::from_millis(800));
        for (category, items) in digest.successes() {
            assert_eq!(items.len() as i64, category.id());
            assert!(items.iter().all(|i| i.category_id == category.id()));
            assert!(items.iter().all(|i| i.published_at.starts_with("2024-06-01")));
        }

        let failures: Vec<_> = digest.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Category::World);
        assert_eq!(failures[0].1.code, 503);
        assert_eq!(failures[0].1.message, "feed offline");
        assert_eq!(digest.total_items(), (1..=7).sum::<usize>());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_categories_are_fetched_once() {
        let digest = client()
            .fetch_categories([Category::Science, Category::Science, Category::Technology], None)
            .await;

        assert_eq!(digest.len(), 2);
        assert!(digest.get(Category::Science).unwrap().is_success());
        assert!(digest.get(Category::Health).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn latest_keeps_newest_items_per_category() {
        let digest = client()
            .fetch_categories([Category::Science, Category::Business, Category::World], None)
            .await;

        let latest = digest.latest(2);

        assert_eq!(latest.len(), 2);
        let science: Vec<_> = latest[&Category::Science].iter().map(|i| i.id).collect();
        assert_eq!(science, vec![302, 301]);
        let business: Vec<_> = latest[&Category::Business].iter().map(|i| i.id).collect();
        assert_eq!(business, vec![201, 200]);
        assert!(!latest.contains_key(&Category::World));
    }

    #[test]
    fn empty_digest() {
        let digest = CategoryDigest::default();

        assert!(digest.is_empty());
        assert_eq!(digest.total_items(), 0);
        assert!(digest.latest(3).is_empty());
    }
}
