mod category;
mod news;
mod outcome;

pub use category::Category;
pub use news::{NewsItem, Pagination};
pub use outcome::{
    FetchFailure, FetchOutcome, NewsPage, CANCELLED_CODE, CANCELLED_MESSAGE, INTERNAL_ERROR_CODE,
    INVALID_SHAPE_MESSAGE, UNKNOWN_ERROR_MESSAGE,
};
