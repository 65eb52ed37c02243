use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Category;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    #[serde(alias = "body")]
    pub content: String,
    #[serde(alias = "category")]
    pub category_id: i64,
    /// Upstream-defined format, compared as plain text.
    #[serde(alias = "publishedAt", alias = "date")]
    pub published_at: String,
    #[serde(alias = "source_name", alias = "sourceName")]
    pub source: String,
    #[serde(alias = "link")]
    pub url: String,
}

impl NewsItem {
    pub fn category(&self) -> Option<Category> {
        Category::from_id(self.category_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawPagination")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Builds a pagination block, deriving `total_pages` from `total`.
    /// Zero `page` or `per_page` are raised to 1. When `total > 0`, `page`
    /// is clamped to `total_pages`.
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(u64::from(per_page));
        let mut page = page.max(1);
        if total > 0 {
            page = page.min(u32::try_from(total_pages).unwrap_or(u32::MAX));
        }
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }

    /// Single page covering `len` items, used when the upstream omits pagination.
    pub fn single_page(len: usize) -> Self {
        let len = len as u64;
        Self::new(1, u32::try_from(len).unwrap_or(u32::MAX), len)
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

#[derive(Deserialize)]
struct RawPagination {
    #[serde(alias = "current_page", alias = "currentPage")]
    page: Option<u32>,
    #[serde(alias = "page_size", alias = "pageSize", alias = "limit")]
    per_page: Option<u32>,
    #[serde(alias = "total_count", alias = "totalCount", alias = "total_items")]
    total: Option<u64>,
    #[serde(alias = "totalPages")]
    total_pages: Option<u64>,
}

impl From<RawPagination> for Pagination {
    fn from(raw: RawPagination) -> Self {
        let total = raw.total.unwrap_or(0);
        let pagination = Pagination::new(
            raw.page.unwrap_or(1),
            raw.per_page.unwrap_or(u32::try_from(total).unwrap_or(u32::MAX)),
            total,
        );
        if raw.total_pages.is_some_and(|n| n != pagination.total_pages) {
            warn!(
                upstream = raw.total_pages,
                derived = pagination.total_pages,
                "Upstream total_pages contradicts total/per_page, using derived value"
            );
        }
        if raw.page.is_some_and(|p| p != pagination.page) {
            warn!(
                upstream = raw.page,
                page = pagination.page,
                "Upstream page out of range, clamped"
            );
        }
        pagination
    }
}
