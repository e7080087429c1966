//! # hub-search-log
//!
//! `SearchIndex` implementation that records submissions via `tracing`.
//! The production indexer is an external collaborator reached over its own
//! client; this adapter keeps the fire-and-forget contract observable in
//! logs without any network dependency.

use async_trait::async_trait;

use hub_core::error::Result;
use hub_core::models::Post;
use hub_core::traits::SearchIndex;

#[derive(Default)]
pub struct LogSearchIndex;

impl LogSearchIndex {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchIndex for LogSearchIndex {
    async fn submit(&self, post: &Post) -> Result<()> {
        tracing::info!(
            post_id = %post.id(),
            title = post.title(),
            category = post.category(),
            kind = post.kind().as_str(),
            "submitted post to search index"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::models::{Post, PostDraft, PostKind};
    use uuid::Uuid;

    #[tokio::test]
    async fn submit_always_succeeds() {
        let index = LogSearchIndex::new();
        let post = Post::create(
            Uuid::now_v7(),
            PostDraft {
                title: "Title".to_string(),
                url: None,
                text: Some("some body text".to_string()),
                category: "general".to_string(),
                kind: PostKind::Idea,
            },
        )
        .unwrap();
        assert!(index.submit(&post).await.is_ok());
    }
}
