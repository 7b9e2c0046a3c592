use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::rss::{self, RssItems};
use super::types::{FeedFormat, FeedItem, ItemKind, ParseOptions};
use crate::util::strip_control_chars;

/// Base for the relative permalinks found in JSON listings
const REDDIT_BASE: &str = "https://www.reddit.com";

/// Errors raised while decoding a payload into feed items.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Payload is not a JSON listing document (or a child has the wrong shape)
    #[error("Invalid JSON listing: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload could not be parsed as RSS or Atom
    #[error("Invalid RSS/Atom feed: {0}")]
    Feed(String),
    /// A listing child carried a kind other than `Listing`, `t1` or `t3`
    #[error("Unrecognized reddit kind: {0:?}")]
    UnrecognizedKind(String),
    /// An RSS entry's permalink did not match `/r/<sub>/comments/<id>/...`
    #[error("Permalink does not point at a reddit thread: {0}")]
    UnrecognizedPermalink(String),
    /// An RSS entry lacked a field required to build an item
    #[error("Feed entry is missing its {0}")]
    MissingField(&'static str),
}

/// Lazy sequence of items decoded from one payload.
///
/// Items are converted one at a time as the caller pulls them, so a bad
/// entry surfaces mid-iteration after every earlier item has been yielded.
/// The sequence is fused after the first error.
pub struct FeedItems {
    inner: Inner,
}

enum Inner {
    Listing(ListingItems),
    Rss(RssItems),
}

impl Iterator for FeedItems {
    type Item = Result<FeedItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Listing(items) => items.next(),
            Inner::Rss(items) => items.next(),
        }
    }
}

/// Decodes a fetched payload into a lazy sequence of [`FeedItem`]s.
///
/// `FeedFormat::Auto` sniffs the payload first. Errors returned here are
/// document-level (not JSON, not a feed); per-item errors such as
/// [`ParseError::UnrecognizedKind`] come out of the iterator.
///
/// # Example
///
/// ```
/// use reddittweeter::feed::{parse_feed, FeedFormat, ParseOptions};
///
/// let json = br#"{"kind": "Listing", "data": {"children": [
///     {"kind": "t3", "data": {"id": "abc", "name": "t3_abc", "title": "Hello",
///                             "author": "alice", "subreddit": "rust", "score": 5}}
/// ]}}"#;
///
/// let items: Vec<_> = parse_feed(json, FeedFormat::Auto, ParseOptions::default())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(items[0].id, "t3_abc");
/// ```
pub fn parse_feed(
    bytes: &[u8],
    format: FeedFormat,
    options: ParseOptions,
) -> Result<FeedItems, ParseError> {
    let inner = match format.resolve(bytes) {
        FeedFormat::Rss => Inner::Rss(rss::parse_entries(bytes)?),
        _ => Inner::Listing(ListingItems::from_slice(bytes, options)?),
    };
    Ok(FeedItems { inner })
}

// ============================================================================
// JSON listings
// ============================================================================

/// A reddit "thing": `{"kind": ..., "data": {...}}`
#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    #[serde(default)]
    data: Value,
}

/// A listing page is either one listing or, for comment pages, an array of
/// them (the submission listing followed by the comment listing).
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Many(Vec<Thing>),
    One(Thing),
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct LinkData {
    id: String,
    name: Option<String>,
    title: String,
    #[serde(default)]
    author: String,
    subreddit: Option<String>,
    score: Option<i64>,
    domain: Option<String>,
    permalink: Option<String>,
    created_utc: Option<f64>,
    #[serde(default)]
    over_18: bool,
}

#[derive(Deserialize)]
struct CommentData {
    id: String,
    name: Option<String>,
    body: String,
    #[serde(default)]
    author: String,
    /// Fullname of the parent submission (`t3_xxx`)
    link_id: String,
    subreddit: Option<String>,
    score: Option<i64>,
    permalink: Option<String>,
    created_utc: Option<f64>,
    #[serde(default)]
    over_18: bool,
}

/// Flattens nested listings with an explicit work stack.
///
/// Children are pushed in reverse so items come out in document order.
struct ListingItems {
    stack: Vec<Thing>,
    filter_adult: bool,
}

impl ListingItems {
    fn from_slice(bytes: &[u8], options: ParseOptions) -> Result<Self, ParseError> {
        let mut stack = match serde_json::from_slice::<Document>(bytes)? {
            Document::Many(things) => things,
            Document::One(thing) => vec![thing],
        };
        stack.reverse();

        Ok(Self {
            stack,
            filter_adult: options.filter_adult,
        })
    }

    /// Expands one thing: listings feed the stack, items are converted.
    fn expand(&mut self, thing: Thing) -> Result<Option<FeedItem>, ParseError> {
        let item = match thing.kind.as_str() {
            "Listing" => {
                let listing: ListingData = serde_json::from_value(thing.data)?;
                self.stack.extend(listing.children.into_iter().rev());
                return Ok(None);
            }
            "t3" => link_item(serde_json::from_value(thing.data)?),
            "t1" => comment_item(serde_json::from_value(thing.data)?),
            other => return Err(ParseError::UnrecognizedKind(other.to_string())),
        };

        if item.is_adult && self.filter_adult {
            tracing::debug!(id = %item.id, "Dropping adult-only item");
            return Ok(None);
        }

        Ok(Some(item))
    }
}

impl Iterator for ListingItems {
    type Item = Result<FeedItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(thing) = self.stack.pop() {
            match self.expand(thing) {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => continue,
                Err(e) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

fn link_item(data: LinkData) -> FeedItem {
    let link = match data.permalink {
        Some(permalink) => absolute_permalink(&permalink),
        None => format!("{}/comments/{}", REDDIT_BASE, data.id),
    };

    FeedItem {
        id: data.name.unwrap_or_else(|| format!("t3_{}", data.id)),
        kind: ItemKind::Link,
        text: strip_control_chars(&data.title).into_owned(),
        author: data.author,
        subreddit: data.subreddit,
        score: data.score,
        domain: data.domain,
        link,
        created_at: data.created_utc.map(|t| t as i64).unwrap_or(0),
        is_adult: data.over_18,
        thread_id: data.id,
    }
}

fn comment_item(data: CommentData) -> FeedItem {
    // "t3_abc" -> "abc"
    let thread_id = match data.link_id.split_once('_') {
        Some((_, id)) => id.to_string(),
        None => data.link_id.clone(),
    };
    let link = match data.permalink {
        Some(permalink) => absolute_permalink(&permalink),
        None => format!("{}/comments/{}/_/{}", REDDIT_BASE, thread_id, data.id),
    };

    FeedItem {
        id: data.name.unwrap_or_else(|| format!("t1_{}", data.id)),
        kind: ItemKind::Comment,
        thread_id,
        text: strip_control_chars(&data.body).into_owned(),
        author: data.author,
        subreddit: data.subreddit,
        score: data.score,
        domain: None,
        link,
        created_at: data.created_utc.map(|t| t as i64).unwrap_or(0),
        is_adult: data.over_18,
    }
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{}{}", REDDIT_BASE, permalink)
    }
}
