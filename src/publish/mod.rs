//! Publishing formatted posts to the microblogging service.
//!
//! The [`Publisher`] trait is the seam between the session driver and the
//! remote API. Failures come back as a [`PublishError`] whose variants the
//! driver can act on without inspecting messages: a
//! [`PublishError::DuplicateContent`] rejection counts as published, anything
//! else aborts the run.

use async_trait::async_trait;
use thiserror::Error;

mod auth;
mod twitter;

pub use auth::{Credentials, CredentialsError};
pub use twitter::{TwitterPublisher, DEFAULT_API_BASE_URL};

/// Errors returned by a [`Publisher`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The service refused the post because identical content was already posted
    #[error("Duplicate content rejected: {0}")]
    DuplicateContent(String),
    /// The service answered with a non-2xx status for any other reason
    #[error("Publish rejected (status {status}): {reason}")]
    Rejected { status: u16, reason: String },
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the publish timeout
    #[error("Request timed out")]
    Timeout,
    /// The request could not be signed
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl PublishError {
    /// Returns true for the soft failure that still counts as a successful post.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PublishError::DuplicateContent(_))
    }
}

/// A destination that accepts one message per call.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `message` as a new status.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::DuplicateContent`] when the service rejects the
    /// post as a repeat, and another variant for every other failure.
    async fn publish(&self, message: &str) -> Result<(), PublishError>;
}
