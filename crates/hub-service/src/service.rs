//! # PostService
//!
//! Orchestrates every aggregate operation behind the explicit lifecycle
//! pipeline: raw atomic write, conditional auto-upvote on create, then
//! reference resolution. Callers never observe the aggregate between the
//! raw write and the resolved view.
//!
//! Concurrency discipline: optimistic writes with bounded retry. Each
//! mutation is load → apply in memory → compare-and-swap persist; a
//! `Conflict` re-fetches and re-applies up to `MAX_WRITE_ATTEMPTS` times
//! before surfacing to the caller.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use hub_core::error::{AppError, Result};
use hub_core::models::{Ballot, Post, PostDraft, PostKind};
use hub_core::traits::{PostFilter, PostStore, SearchIndex, UserDirectory};
use hub_core::view::PostView;

use crate::resolve::{resolve_post, resolve_posts};

/// CAS retry budget per mutation. Conflicts past this surface to the caller.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// The aggregate-level API, independent of transport.
pub struct PostService {
    store: Arc<dyn PostStore>,
    directory: Arc<dyn UserDirectory>,
    search: Arc<dyn SearchIndex>,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        directory: Arc<dyn UserDirectory>,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            store,
            directory,
            search,
        }
    }

    /// Creates a post for `actor`.
    ///
    /// Pipeline: (1) raw write of the validated aggregate; (2) the author's
    /// automatic upvote, itself a raw write; (3) reference resolution. A
    /// copy is also submitted to the search index fire-and-forget; its
    /// failure is logged, never propagated.
    pub async fn create(&self, actor: Uuid, draft: PostDraft) -> Result<PostView> {
        let mut post = Post::create(actor, draft)?;
        self.store.insert(&post).await?;

        post.vote(actor, Ballot::Up);
        let stored = self.store.update(post).await?;
        debug!(post_id = %stored.id(), "created post with author auto-upvote");

        let search = Arc::clone(&self.search);
        let snapshot = stored.clone();
        tokio::spawn(async move {
            if let Err(err) = search.submit(&snapshot).await {
                warn!(post_id = %snapshot.id(), error = %err, "search index submission failed");
            }
        });

        resolve_post(self.directory.as_ref(), &stored).await
    }

    /// Fetches one post, bumping its view counter (a persisted mutation).
    pub async fn get(&self, id: Uuid) -> Result<PostView> {
        self.mutate(id, |post| {
            post.record_view();
            Ok(())
        })
        .await
    }

    /// All posts, highest score first.
    pub async fn list(&self) -> Result<Vec<PostView>> {
        self.list_filtered(&PostFilter::All).await
    }

    /// Posts in a category, highest score first.
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<PostView>> {
        self.list_filtered(&PostFilter::Category(category.to_string()))
            .await
    }

    /// Ideas or projects, highest score first.
    pub async fn list_by_kind(&self, kind: PostKind) -> Result<Vec<PostView>> {
        self.list_filtered(&PostFilter::Kind(kind)).await
    }

    /// One author's posts, newest first.
    pub async fn list_by_author(&self, author: Uuid) -> Result<Vec<PostView>> {
        self.list_filtered(&PostFilter::Author(author)).await
    }

    /// Casts a ballot for `actor` on the post.
    pub async fn vote(&self, actor: Uuid, id: Uuid, ballot: Ballot) -> Result<PostView> {
        self.mutate(id, |post| {
            post.vote(actor, ballot);
            Ok(())
        })
        .await
    }

    pub async fn upvote(&self, actor: Uuid, id: Uuid) -> Result<PostView> {
        self.vote(actor, id, Ballot::Up).await
    }

    pub async fn downvote(&self, actor: Uuid, id: Uuid) -> Result<PostView> {
        self.vote(actor, id, Ballot::Down).await
    }

    pub async fn unvote(&self, actor: Uuid, id: Uuid) -> Result<PostView> {
        self.vote(actor, id, Ballot::Retract).await
    }

    /// Adds `actor` to the roster, capturing their display name from the
    /// directory at join time. Idempotent for existing members.
    pub async fn join(&self, actor: Uuid, id: Uuid, role: &str) -> Result<PostView> {
        let profile = self
            .directory
            .lookup(actor)
            .await?
            .ok_or_else(|| AppError::not_found("user", actor))?;
        self.mutate(id, |post| {
            post.join(&profile, role);
            Ok(())
        })
        .await
    }

    /// Removes `actor` from the roster; silent no-op for non-members.
    pub async fn leave(&self, actor: Uuid, id: Uuid) -> Result<PostView> {
        self.mutate(id, |post| {
            post.leave(actor);
            Ok(())
        })
        .await
    }

    /// Overwrites `actor`'s role and contribution text; silent no-op for
    /// non-members.
    pub async fn change_contribution(
        &self,
        actor: Uuid,
        id: Uuid,
        role: &str,
        contribution: &str,
    ) -> Result<PostView> {
        self.mutate(id, |post| {
            post.change_contribution(actor, role, contribution);
            Ok(())
        })
        .await
    }

    /// Appends a comment by `actor`.
    pub async fn add_comment(&self, actor: Uuid, id: Uuid, body: &str) -> Result<PostView> {
        self.mutate(id, |post| {
            post.add_comment(actor, body)?;
            Ok(())
        })
        .await
    }

    /// Removes a comment by id; `NotFound` leaves the aggregate untouched.
    pub async fn remove_comment(&self, id: Uuid, comment_id: Uuid) -> Result<PostView> {
        self.mutate(id, |post| post.remove_comment(comment_id)).await
    }

    /// Sets the classification unconditionally.
    pub async fn change_kind(&self, id: Uuid, kind: PostKind) -> Result<PostView> {
        self.mutate(id, |post| {
            post.change_kind(kind);
            Ok(())
        })
        .await
    }

    pub async fn upgrade(&self, id: Uuid) -> Result<PostView> {
        self.change_kind(id, PostKind::Project).await
    }

    pub async fn downgrade(&self, id: Uuid) -> Result<PostView> {
        self.change_kind(id, PostKind::Idea).await
    }

    /// Deletes the post wholesale. No soft-delete state.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.remove(id).await
    }

    async fn list_filtered(&self, filter: &PostFilter) -> Result<Vec<PostView>> {
        let posts = self.store.list(filter).await?;
        resolve_posts(self.directory.as_ref(), &posts).await
    }

    /// The shared mutation loop: load, apply, CAS-persist, resolve.
    ///
    /// `apply` must be pure over the post (no external side effects) since
    /// it re-runs on every retry. An `Err` from `apply` aborts before any
    /// write, so failed domain operations never persist.
    async fn mutate<F>(&self, id: Uuid, mut apply: F) -> Result<PostView>
    where
        F: FnMut(&mut Post) -> Result<()>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut post = self.store.load(id).await?;
            apply(&mut post)?;
            match self.store.update(post).await {
                Ok(stored) => return resolve_post(self.directory.as_ref(), &stored).await,
                Err(AppError::Conflict(_)) if attempts < MAX_WRITE_ATTEMPTS => {
                    debug!(post_id = %id, attempts, "write conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
