pub mod categories;
pub mod news;

pub use categories::CategoryDigest;
pub use news::RequestSpec;
