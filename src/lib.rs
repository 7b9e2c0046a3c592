//! Posts new reddit submissions and comments to a microblogging account.
//!
//! A run fetches one listing ([`feed`]), turns each item into a post that fits
//! the character budget ([`format`]), skips anything already in the dedup
//! database ([`storage`]), publishes the rest ([`publish`]) and finally prunes
//! old dedup records. [`session::Session`] drives those steps.

pub mod config;
pub mod feed;
pub mod format;
pub mod publish;
pub mod session;
pub mod storage;
pub mod util;
