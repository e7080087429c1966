//! # hub-db-memory
//!
//! DashMap-backed implementation of `PostStore` with the same
//! compare-and-swap semantics as the SQLite adapter. Used by the service
//! test suite and for embedded/demo assemblies.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use hub_core::error::{AppError, Result};
use hub_core::models::Post;
use hub_core::traits::{PostFilter, PostStore};

#[derive(Default)]
pub struct MemoryPostStore {
    posts: DashMap<Uuid, Post>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, post: &Post) -> Result<()> {
        match self.posts.entry(post.id()) {
            Entry::Vacant(slot) => {
                slot.insert(post.clone());
                Ok(())
            }
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "post {} already exists",
                post.id()
            ))),
        }
    }

    async fn load(&self, id: Uuid) -> Result<Post> {
        self.posts
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::not_found("post", id))
    }

    /// The map shard lock makes check-and-replace atomic per id.
    async fn update(&self, post: Post) -> Result<Post> {
        match self.posts.entry(post.id()) {
            Entry::Occupied(mut slot) => {
                if slot.get().revision() != post.revision() {
                    return Err(AppError::Conflict(format!(
                        "post {} was modified concurrently",
                        post.id()
                    )));
                }
                let mut next = post;
                next.bump_revision();
                slot.insert(next.clone());
                Ok(next)
            }
            Entry::Vacant(_) => Err(AppError::not_found("post", post.id())),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.posts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("post", id))
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| match filter {
                PostFilter::All => true,
                PostFilter::Category(category) => entry.category() == category,
                PostFilter::Kind(kind) => entry.kind() == *kind,
                PostFilter::Author(author) => entry.author() == *author,
            })
            .map(|entry| entry.clone())
            .collect();

        match filter {
            PostFilter::Author(_) => posts.sort_by(|a, b| b.created().cmp(&a.created())),
            _ => posts.sort_by(|a, b| b.score().cmp(&a.score())),
        }
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::models::{Ballot, PostDraft, PostKind};

    fn draft(title: &str, category: &str, kind: PostKind) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            url: None,
            text: Some("some body text".to_string()),
            category: category.to_string(),
            kind,
        }
    }

    fn post(title: &str, category: &str, kind: PostKind) -> Post {
        Post::create(Uuid::now_v7(), draft(title, category, kind)).unwrap()
    }

    #[tokio::test]
    async fn insert_load_roundtrip() {
        let store = MemoryPostStore::new();
        let post = post("one", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();
        let loaded = store.load(post.id()).await.unwrap();
        assert_eq!(loaded, post);

        let err = store.load(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn double_insert_conflicts() {
        let store = MemoryPostStore::new();
        let post = post("one", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();
        let err = store.insert(&post).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = MemoryPostStore::new();
        let post = post("one", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();

        // Two copies derived from revision 0.
        let mut first = store.load(post.id()).await.unwrap();
        let mut second = store.load(post.id()).await.unwrap();

        first.vote(Uuid::now_v7(), Ballot::Up);
        let stored = store.update(first).await.unwrap();
        assert_eq!(stored.revision(), 1);

        second.vote(Uuid::now_v7(), Ballot::Down);
        let err = store.update(second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The winning write is intact.
        let current = store.load(post.id()).await.unwrap();
        assert_eq!(current.score(), 1);
    }

    #[tokio::test]
    async fn update_missing_post_is_not_found() {
        let store = MemoryPostStore::new();
        let post = post("one", "general", PostKind::Idea);
        let err = store.update(post).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let store = MemoryPostStore::new();
        let mut high = post("high", "robotics", PostKind::Idea);
        high.vote(Uuid::now_v7(), Ballot::Up);
        high.vote(Uuid::now_v7(), Ballot::Up);
        let mut low = post("low", "robotics", PostKind::Project);
        low.vote(Uuid::now_v7(), Ballot::Down);
        let other = post("other", "music", PostKind::Idea);

        for p in [&high, &low, &other] {
            store.insert(p).await.unwrap();
        }

        let all = store.list(&PostFilter::All).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["high", "other", "low"]);

        let robotics = store
            .list(&PostFilter::Category("robotics".to_string()))
            .await
            .unwrap();
        assert_eq!(robotics.len(), 2);
        assert_eq!(robotics[0].title(), "high");

        let projects = store.list(&PostFilter::Kind(PostKind::Project)).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title(), "low");

        let by_author = store
            .list(&PostFilter::Author(high.author()))
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_wholesale() {
        let store = MemoryPostStore::new();
        let post = post("one", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();
        store.remove(post.id()).await.unwrap();
        assert!(store.is_empty());

        let err = store.remove(post.id()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }
}
