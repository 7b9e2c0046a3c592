//! Feed retrieval and decoding.
//!
//! - [`fetcher`] - one HTTP GET for the configured source URL
//! - [`parser`] - JSON listing decoding and format dispatch
//! - [`rss`] - RSS/Atom entries keyed through their permalinks
//!
//! # Example
//!
//! ```ignore
//! use crate::feed::{fetch_feed, parse_feed, FeedFormat, ParseOptions};
//!
//! let bytes = fetch_feed(&client, "https://www.reddit.com/r/rust/new.json").await?;
//! for item in parse_feed(&bytes, FeedFormat::Auto, ParseOptions::default())? {
//!     println!("{}", item?.id);
//! }
//! ```

mod fetcher;
mod parser;
mod rss;
mod types;

pub use fetcher::{build_client, fetch_feed, validate_source_url, FetchError};
pub use parser::{parse_feed, FeedItems, ParseError};
pub use types::{FeedFormat, FeedItem, ItemKind, ParseOptions};
