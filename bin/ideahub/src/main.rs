//! # IdeaHub Binary
//!
//! Assembles the service from feature-selected plugins and runs a seed
//! flow against it. Transport adapters (HTTP and friends) mount
//! [`PostService`] themselves; this binary exists to wire plugins, verify
//! the assembly end to end, and leave a seeded database behind for local
//! development.

use std::sync::Arc;

use anyhow::Result;
use hub_core::models::{PostDraft, PostKind};
use hub_core::traits::{PostStore, SearchIndex, UserDirectory};
use hub_directory_memory::MemoryDirectory;
use hub_search_log::LogSearchIndex;
use hub_service::PostService;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use hub_db_sqlite::SqlitePostStore;

#[cfg(not(feature = "db-sqlite"))]
use hub_db_memory::MemoryPostStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Initialize the persistence implementation
    #[cfg(feature = "db-sqlite")]
    let store: Arc<dyn PostStore> = {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:ideahub.db".into());
        Arc::new(SqlitePostStore::new(&url).await?)
    };

    #[cfg(not(feature = "db-sqlite"))]
    let store: Arc<dyn PostStore> = Arc::new(MemoryPostStore::new());

    // 2. External collaborators: directory and search indexer
    let directory = Arc::new(MemoryDirectory::new());
    let search: Arc<dyn SearchIndex> = Arc::new(LogSearchIndex::new());

    // 3. Wire the service
    let service = PostService::new(store, Arc::clone(&directory) as Arc<dyn UserDirectory>, search);

    tracing::info!("🚀 IdeaHub assembled, running seed flow");
    seed(&service, &directory).await
}

/// Exercises the full lifecycle once: create with auto-upvote, votes from
/// other users, a join, and a comment, then prints the resolved view.
async fn seed(service: &PostService, directory: &MemoryDirectory) -> Result<()> {
    let ada = directory.register("ada");
    let bob = directory.register("bob");

    let post = service
        .create(
            ada.id,
            PostDraft {
                title: "Garden rover".to_string(),
                url: None,
                text: Some("An autonomous rover that weeds the garden".to_string()),
                category: "robotics".to_string(),
                kind: PostKind::Idea,
            },
        )
        .await?;
    tracing::info!(post_id = %post.id, score = post.score, "seeded post");

    service.upvote(bob.id, post.id).await?;
    service.join(bob.id, post.id, "Engineer").await?;
    service
        .add_comment(bob.id, post.id, "Happy to build the chassis")
        .await?;

    let resolved = service.get(post.id).await?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
