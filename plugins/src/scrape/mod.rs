pub mod extract;
pub mod http;

pub use extract::{extract_product, page_title};
pub use http::HttpScrapeBackend;
