//! # Reference Resolution
//!
//! Read-time enrichment: replaces the author id on a post and on each of
//! its comments with a denormalized profile from the user directory. This
//! runs after every load and after every persist, so callers only ever see
//! resolved views.
//!
//! Missing users are not an error; cross-aggregate consistency is
//! best-effort, so a dangling author reference degrades to a placeholder.
//! Directory I/O failures do propagate.

use std::collections::BTreeMap;
use uuid::Uuid;

use hub_core::error::Result;
use hub_core::traits::UserDirectory;
use hub_core::view::{AuthorView, PostView};
use hub_core::Post;

/// Username shown when the directory has no entry for a referenced user.
pub const UNKNOWN_USER: &str = "[unknown]";

/// Resolves one post into its enriched view.
pub async fn resolve_post(directory: &dyn UserDirectory, post: &Post) -> Result<PostView> {
    let mut cache: BTreeMap<Uuid, AuthorView> = BTreeMap::new();

    let author = resolve_author(directory, post.author(), &mut cache).await?;
    let mut comment_authors = Vec::with_capacity(post.comments().len());
    for comment in post.comments().iter() {
        comment_authors.push(resolve_author(directory, comment.author, &mut cache).await?);
    }

    Ok(PostView::assemble(post, author, comment_authors))
}

/// Resolves a whole listing, preserving the store's ordering.
pub async fn resolve_posts(directory: &dyn UserDirectory, posts: &[Post]) -> Result<Vec<PostView>> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(resolve_post(directory, post).await?);
    }
    Ok(views)
}

// One directory round trip per distinct user id within a post.
async fn resolve_author(
    directory: &dyn UserDirectory,
    id: Uuid,
    cache: &mut BTreeMap<Uuid, AuthorView>,
) -> Result<AuthorView> {
    if let Some(hit) = cache.get(&id) {
        return Ok(hit.clone());
    }
    let view = match directory.lookup(id).await? {
        Some(profile) => AuthorView::from(profile),
        None => AuthorView {
            id,
            username: UNKNOWN_USER.to_string(),
        },
    };
    cache.insert(id, view.clone());
    Ok(view)
}
