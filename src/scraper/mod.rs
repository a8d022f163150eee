pub mod fetcher;
pub mod fields;
pub mod parser;

pub use fetcher::{HttpFetcher, PageSource, RetryPolicy};
pub use parser::ListingParser;
