//! Turns one feed item into a single post that fits the character budget.
//!
//! A post is `primary text + extras + link suffix`:
//!
//! - links: `Title [subreddit] 5 points, submitted by alice [example.com] http://redd.it/abc`
//! - comments: `"Comment body", commented by bob on http://redd.it/abc`
//!
//! When the primary text and suffix alone overflow, the text is cut and an
//! ellipsis inserted so the post lands exactly on the budget, and no extras
//! are added. Otherwise extras are appended greedily in priority order,
//! stopping for good at the first one that would reach the budget.

use crate::feed::{FeedItem, ItemKind};
use crate::util::{char_len, truncate_chars, unescape_html, ELLIPSIS};

/// Default post budget in characters
pub const DEFAULT_MAX_LENGTH: usize = 140;
/// Default host for short item links
pub const DEFAULT_SHORT_LINK_BASE: &str = "http://redd.it";

/// Formatting parameters, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Hard limit on post length in characters
    pub max_length: usize,
    /// Prefix of the short link, without trailing slash
    pub short_link_base: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            short_link_base: DEFAULT_SHORT_LINK_BASE.to_string(),
        }
    }
}

/// A post ready to publish, keyed by the item's dedup id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPost {
    pub id: String,
    pub message: String,
}

/// The pieces a post is assembled from, before length fitting.
struct Parts {
    primary: String,
    extras: Vec<String>,
    suffix: String,
}

fn parts(item: &FeedItem, options: &FormatOptions) -> Parts {
    let base = options.short_link_base.trim_end_matches('/');
    let text = unescape_html(&item.text);

    match item.kind {
        ItemKind::Link => {
            let mut extras = Vec::with_capacity(4);
            if let Some(subreddit) = &item.subreddit {
                extras.push(format!(" [{}]", subreddit));
            }
            if let Some(score) = item.score {
                extras.push(format!(" {} points", score));
            }
            extras.push(format!(", submitted by {}", item.author));
            if let Some(domain) = &item.domain {
                extras.push(format!(" [{}]", domain));
            }

            Parts {
                primary: text.into_owned(),
                extras,
                suffix: format!(" {}/{}", base, item.thread_id),
            }
        }
        ItemKind::Comment => Parts {
            primary: format!("\"{}\"", text),
            extras: vec![format!(", commented by {}", item.author)],
            suffix: format!(" on {}/{}", base, item.thread_id),
        },
    }
}

/// Formats one item into a post no longer than `options.max_length` characters.
///
/// # Example
///
/// ```
/// use reddittweeter::feed::{FeedItem, ItemKind};
/// use reddittweeter::format::{format_item, FormatOptions};
///
/// let item = FeedItem {
///     id: "t3_abc".into(),
///     kind: ItemKind::Link,
///     thread_id: "abc".into(),
///     text: "A very short post".into(),
///     author: "alice".into(),
///     subreddit: Some("test".into()),
///     score: Some(5),
///     domain: Some("example.com".into()),
///     link: "https://www.reddit.com/r/test/comments/abc/".into(),
///     created_at: 0,
///     is_adult: false,
/// };
///
/// let post = format_item(&item, &FormatOptions::default());
/// assert_eq!(
///     post.message,
///     "A very short post [test] 5 points, submitted by alice [example.com] http://redd.it/abc"
/// );
/// ```
pub fn format_item(item: &FeedItem, options: &FormatOptions) -> FormattedPost {
    let Parts {
        primary,
        extras,
        suffix,
    } = parts(item, options);

    let max = options.max_length;
    let suffix_len = char_len(&suffix);
    let primary_len = char_len(&primary);

    let message = if primary_len + suffix_len > max {
        let keep = max.saturating_sub(suffix_len + ELLIPSIS.len());
        let message = format!("{}{}{}", truncate_chars(&primary, keep), ELLIPSIS, suffix);
        // Only when the suffix alone nearly fills the budget
        truncate_chars(&message, max).into_owned()
    } else {
        let mut body = primary;
        let mut len = primary_len + suffix_len;
        for extra in &extras {
            let extra_len = char_len(extra);
            if len + extra_len >= max {
                break;
            }
            body.push_str(extra);
            len += extra_len;
        }
        body.push_str(&suffix);
        body
    };

    FormattedPost {
        id: item.id.clone(),
        message,
    }
}
