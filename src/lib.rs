pub mod api;
pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod paths;
pub mod validator;

pub mod prelude {
    pub use crate::api::{CategoryDigest, RequestSpec};
    pub use crate::client::{ClientConfig, NewsClient, RetryPolicy};
    pub use crate::error::ClientError;
    pub use crate::models::{Category, FetchFailure, FetchOutcome, NewsItem, NewsPage, Pagination};
    pub use crate::validator::{is_success, items_of};
}
