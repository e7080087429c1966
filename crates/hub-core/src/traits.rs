//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the service.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Post, PostKind, UserProfile};

/// Selection criteria for list queries. The adapter also owns the sort
/// order: descending score, except by-author which sorts by creation time
/// descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Category(String),
    Kind(PostKind),
    Author(Uuid),
}

/// Data persistence contract for post aggregates.
///
/// A post persists as one atomic unit: metadata, votes, participants, and
/// comments are written together or not at all. `update` is a
/// compare-and-swap on the post's revision: a stale revision yields
/// `Conflict` and the caller re-fetches and retries.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Writes a brand-new aggregate. `Conflict` if the id already exists.
    async fn insert(&self, post: &Post) -> Result<()>;

    /// Loads the aggregate by id; `NotFound` when absent.
    async fn load(&self, id: Uuid) -> Result<Post>;

    /// Compare-and-swap write: succeeds only if the stored revision matches
    /// `post.revision()`, and returns the stored copy with the revision
    /// bumped.
    async fn update(&self, post: Post) -> Result<Post>;

    /// Deletes the aggregate wholesale; `NotFound` when absent.
    async fn remove(&self, id: Uuid) -> Result<()>;

    /// Lists aggregates matching the filter, sorted per the filter's
    /// contract.
    async fn list(&self, filter: &PostFilter) -> Result<Vec<Post>>;
}

/// User-profile directory contract, used for reference resolution and for
/// capturing display names at join time.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` means the user genuinely does not exist; errors are
    /// infrastructure failures.
    async fn lookup(&self, id: Uuid) -> Result<Option<UserProfile>>;
}

/// Full-text search contract. Receives a copy of newly created posts;
/// the service treats submission as fire-and-forget.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn submit(&self, post: &Post) -> Result<()>;
}
