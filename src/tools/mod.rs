//! External capabilities used by the evidence sources
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search backends (DuckDuckGo, Tavily, Serper)
//! - [`scrape`](crate::tools::scrape) - Page scrapers and the bounded scrape pool
//!
//! Both are resolved once from configuration through enum registries
//! ([`SearchBackend`](search::SearchBackend), [`ScraperKind`](scrape::ScraperKind)).

/// Page scrapers and bounded concurrent scraping.
pub mod scrape;
/// Web search backends.
pub mod search;
