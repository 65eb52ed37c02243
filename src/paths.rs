pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/news";
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const CATEGORY_PARAM: &str = "category";
pub const DATE_PARAM: &str = "date";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";
