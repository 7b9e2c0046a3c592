//! One polling run: fetch, parse, format, dedup, publish, record, expire.
//!
//! The driver is strictly sequential. Each published item is recorded (and
//! committed) before the next one is looked at, so an aborted run keeps
//! everything it already posted. Expiry of old records always runs once
//! iteration stops, whether it stopped by exhaustion, by the per-run cap or
//! by an error.

use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{
    fetch_feed, parse_feed, FeedFormat, FeedItem, FetchError, ParseError, ParseOptions,
};
use crate::format::{format_item, FormatOptions};
use crate::publish::{PublishError, Publisher};
use crate::storage::{Database, DatabaseError};

/// Default number of items posted per run
pub const DEFAULT_MAX_POSTS: usize = 10;
/// Default pause between two publishes
pub const DEFAULT_POST_DELAY: Duration = Duration::from_millis(1000);
/// Default retention window for dedup records, in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to fetch feed")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse feed")]
    Parse(#[from] ParseError),

    #[error("Failed to publish")]
    Publish(#[from] PublishError),

    #[error("Dedup store error")]
    Store(#[from] DatabaseError),
}

// ============================================================================
// Settings and Report
// ============================================================================

/// Everything the driver needs to know about one run.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Stop after this many items were published or suppressed as duplicates
    pub max_posts: usize,
    /// Pause before every publish except the first
    pub post_delay: Duration,
    /// Records older than this many days are deleted at the end of the run
    pub retention_days: u32,
    pub feed_format: FeedFormat,
    pub parse: ParseOptions,
    pub format: FormatOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_posts: DEFAULT_MAX_POSTS,
            post_delay: DEFAULT_POST_DELAY,
            retention_days: DEFAULT_RETENTION_DAYS,
            feed_format: FeedFormat::default(),
            parse: ParseOptions::default(),
            format: FormatOptions::default(),
        }
    }
}

impl SessionSettings {
    /// Unix timestamp before which records are expired, relative to `now`.
    pub fn expiry_cutoff(&self, now: i64) -> i64 {
        now.saturating_sub(i64::from(self.retention_days) * SECONDS_PER_DAY)
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Items accepted by the publisher
    pub posted: usize,
    /// Items already in the dedup store
    pub skipped: usize,
    /// Items the publisher rejected as duplicate content (still recorded)
    pub duplicates: usize,
    /// Records removed by expiry
    pub expired: u64,
    /// Iteration stopped at `max_posts`
    pub cap_reached: bool,
}

impl SessionReport {
    /// Items that were recorded during this run.
    pub fn recorded(&self) -> usize {
        self.posted + self.duplicates
    }
}

// ============================================================================
// Session Driver
// ============================================================================

pub struct Session<P> {
    db: Database,
    publisher: P,
    settings: SessionSettings,
}

impl<P: Publisher> Session<P> {
    pub fn new(db: Database, publisher: P, settings: SessionSettings) -> Self {
        Self {
            db,
            publisher,
            settings,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Fetch `source_url`, then process its items.
    ///
    /// A fetch failure, or a payload that cannot be decoded at all, returns
    /// before the dedup store is touched.
    pub async fn run(
        &self,
        client: &reqwest::Client,
        source_url: &str,
    ) -> Result<SessionReport, SessionError> {
        let bytes = fetch_feed(client, source_url).await?;
        tracing::debug!(url = %source_url, bytes = bytes.len(), "Fetched feed");

        let items = parse_feed(&bytes, self.settings.feed_format, self.settings.parse)?;
        self.process(items).await
    }

    /// Publish every unseen item up to the cap, then expire old records.
    ///
    /// # Errors
    ///
    /// The first parse, publish or store error stops iteration. Expiry still
    /// runs; the iteration error is returned afterwards. Records written
    /// before the error are kept.
    pub async fn process<I>(&self, items: I) -> Result<SessionReport, SessionError>
    where
        I: IntoIterator<Item = Result<FeedItem, ParseError>>,
    {
        let mut report = SessionReport::default();
        let outcome = self.iterate(items, &mut report).await;

        let cutoff = self.settings.expiry_cutoff(Utc::now().timestamp());
        let expired = self.db.expire(cutoff).await;

        match (outcome, expired) {
            (Ok(()), Ok(count)) => {
                tracing::debug!(expired = count, cutoff, "Expired old records");
                report.expired = count;
                Ok(report)
            }
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(e), Ok(count)) => {
                tracing::debug!(expired = count, cutoff, "Expired old records after failed run");
                Err(e)
            }
            (Err(e), Err(expire_err)) => {
                tracing::warn!(error = %expire_err, "Failed to expire old records");
                Err(e)
            }
        }
    }

    async fn iterate<I>(&self, items: I, report: &mut SessionReport) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = Result<FeedItem, ParseError>>,
    {
        let mut items = items.into_iter();

        loop {
            // Checked before pulling, so items past the cap are never read
            if report.recorded() >= self.settings.max_posts {
                tracing::debug!(max_posts = self.settings.max_posts, "Post cap reached");
                report.cap_reached = true;
                return Ok(());
            }

            let Some(item) = items.next() else {
                return Ok(());
            };
            let post = format_item(&item?, &self.settings.format);

            if self.db.exists(&post.id).await? {
                tracing::debug!(id = %post.id, "Already posted, skipping");
                report.skipped += 1;
                continue;
            }

            if report.recorded() > 0 && !self.settings.post_delay.is_zero() {
                tokio::time::sleep(self.settings.post_delay).await;
            }

            match self.publisher.publish(&post.message).await {
                Ok(()) => {
                    tracing::debug!(id = %post.id, message = %post.message, "Published");
                    report.posted += 1;
                }
                Err(e) if e.is_duplicate() => {
                    tracing::debug!(id = %post.id, error = %e, "Duplicate content, recording anyway");
                    report.duplicates += 1;
                }
                Err(e) => {
                    tracing::debug!(id = %post.id, error = %e, "Publish failed, aborting run");
                    return Err(e.into());
                }
            }

            self.db.record(&post.id, Utc::now().timestamp()).await?;
        }
    }
}
