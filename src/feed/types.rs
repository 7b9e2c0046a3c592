use serde::Deserialize;

/// Discriminates a submission from a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A submission (reddit kind `t3`)
    Link,
    /// A reply to a submission (reddit kind `t1`)
    Comment,
}

/// One normalized reddit submission or comment.
///
/// Built fresh from every fetch and consumed by the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Dedup key, stable across runs: the reddit fullname (`t3_abc`, `t1_xyz`)
    pub id: String,
    pub kind: ItemKind,
    /// Submission id used in the short link; for comments, the parent submission
    pub thread_id: String,
    /// Title for links, body for comments (still HTML-escaped)
    pub text: String,
    pub author: String,
    pub subreddit: Option<String>,
    pub score: Option<i64>,
    pub domain: Option<String>,
    /// Canonical URL of the item on reddit
    pub link: String,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    pub is_adult: bool,
}

/// Which payload format the source URL returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// Sniff the payload: JSON if it starts with `{` or `[`, otherwise RSS/Atom
    #[default]
    Auto,
    /// Reddit JSON listing (`.json` URLs)
    Json,
    /// RSS or Atom document (`.rss` URLs)
    Rss,
}

impl FeedFormat {
    /// Resolves `Auto` against the payload; explicit formats pass through.
    pub fn resolve(self, bytes: &[u8]) -> FeedFormat {
        match self {
            FeedFormat::Auto => {
                let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
                match first {
                    Some(b'{') | Some(b'[') => FeedFormat::Json,
                    _ => FeedFormat::Rss,
                }
            }
            explicit => explicit,
        }
    }
}

/// Parser behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop items reddit flags as adult-only (`over_18`)
    pub filter_adult: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { filter_adult: true }
    }
}
