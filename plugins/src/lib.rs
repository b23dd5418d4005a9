pub mod factory;
pub mod http_util;
pub mod llm;
pub mod renderers;
pub mod scrape;
pub mod search;
pub mod strategies;
