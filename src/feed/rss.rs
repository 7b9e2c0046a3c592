//! RSS/Atom path: reddit's `.rss` endpoints serve Atom documents whose
//! entries only identify their subreddit and ids through the permalink.

use feed_rs::model::Entry;
use url::Url;

use super::parser::ParseError;
use super::types::{FeedItem, ItemKind};
use crate::util::{strip_control_chars, strip_markup};

/// Components of `/r/<subreddit>/comments/<post-id>[/<slug>[/<comment-id>]]`
#[derive(Debug, PartialEq, Eq)]
struct Permalink {
    subreddit: String,
    post_id: String,
    comment_id: Option<String>,
}

fn parse_permalink(link: &str) -> Option<Permalink> {
    let url = Url::parse(link).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["r", subreddit, "comments", post_id, rest @ ..] => Some(Permalink {
            subreddit: subreddit.to_string(),
            post_id: post_id.to_string(),
            // rest[0] is the title slug
            comment_id: rest.get(1).map(|s| s.to_string()),
        }),
        _ => None,
    }
}

/// Entries of a parsed feed, converted on demand.
pub(crate) struct RssItems {
    entries: std::vec::IntoIter<Entry>,
    failed: bool,
}

pub(crate) fn parse_entries(bytes: &[u8]) -> Result<RssItems, ParseError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| ParseError::Feed(e.to_string()))?;
    Ok(RssItems {
        entries: feed.entries.into_iter(),
        failed: false,
    })
}

impl Iterator for RssItems {
    type Item = Result<FeedItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = entry_item(self.entries.next()?);
        self.failed = result.is_err();
        Some(result)
    }
}

fn entry_item(entry: Entry) -> Result<FeedItem, ParseError> {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .ok_or(ParseError::MissingField("link"))?;

    // An entry that cannot be keyed fails the run instead of being skipped
    let permalink =
        parse_permalink(&link).ok_or_else(|| ParseError::UnrecognizedPermalink(link.clone()))?;

    let author = entry
        .authors
        .first()
        .map(|p| p.name.trim().trim_start_matches("/u/").to_string())
        .unwrap_or_default();
    let created_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.timestamp())
        .unwrap_or(0);
    let title = entry.title.map(|t| t.content);

    let (id, kind, text) = match permalink.comment_id {
        Some(comment_id) => {
            let body = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .map(|html| strip_markup(&html))
                .or(title)
                .ok_or(ParseError::MissingField("content"))?;
            (format!("t1_{}", comment_id), ItemKind::Comment, body)
        }
        None => {
            let title = title.ok_or(ParseError::MissingField("title"))?;
            (format!("t3_{}", permalink.post_id), ItemKind::Link, title)
        }
    };

    Ok(FeedItem {
        id,
        kind,
        thread_id: permalink.post_id,
        text: strip_control_chars(&text).into_owned(),
        author,
        subreddit: Some(permalink.subreddit),
        score: None,
        domain: None,
        link,
        created_at,
        is_adult: false,
    })
}
