//! # hub-db-sqlite Implementation
//!
//! SQLite-backed `PostStore`. The aggregate persists as one JSON document
//! per row, which gives the atomic whole-aggregate write the domain
//! requires: votes, participants, comments, and metadata land in a single
//! `INSERT`/`UPDATE`. The `category`/`kind`/`author`/`score`/`created`
//! columns are denormalized copies of document fields, maintained on every
//! write so list queries can filter and sort in SQL.
//!
//! Optimistic concurrency: a `revision` column is matched in the `UPDATE`
//! predicate; zero affected rows on an existing post means a concurrent
//! writer got there first.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use hub_core::error::{AppError, Result};
use hub_core::models::Post;
use hub_core::traits::{PostFilter, PostStore};

pub struct SqlitePostStore {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn internal(err: impl std::fmt::Display) -> AppError {
    AppError::internal(err)
}

fn decode_doc(doc: &str) -> Result<Post> {
    serde_json::from_str(doc).map_err(internal)
}

impl SqlitePostStore {
    /// Connects and ensures the schema exists. A single connection is used
    /// so `sqlite::memory:` databases behave in tests.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id       BLOB PRIMARY KEY,
                author   BLOB NOT NULL,
                category TEXT NOT NULL,
                kind     TEXT NOT NULL,
                score    INTEGER NOT NULL,
                created  TIMESTAMP NOT NULL,
                revision INTEGER NOT NULL,
                doc      TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        tracing::debug!(url, "sqlite post store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn insert(&self, post: &Post) -> Result<()> {
        let doc = serde_json::to_string(post).map_err(internal)?;
        let result = sqlx::query(
            "INSERT INTO posts (id, author, category, kind, score, created, revision, doc)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id()))
        .bind(uuid_to_blob(post.author()))
        .bind(post.category())
        .bind(post.kind().as_str())
        .bind(post.score())
        .bind(post.created())
        .bind(post.revision() as i64)
        .bind(doc)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()) =>
            {
                Err(AppError::Conflict(format!(
                    "post {} already exists",
                    post.id()
                )))
            }
            Err(err) => Err(internal(err)),
        }
    }

    async fn load(&self, id: Uuid) -> Result<Post> {
        let row = sqlx::query("SELECT doc FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;

        match row {
            Some(row) => decode_doc(&row.get::<String, _>("doc")),
            None => Err(AppError::not_found("post", id)),
        }
    }

    /// Compare-and-swap on the revision column. The denormalized filter and
    /// sort columns are refreshed in the same statement, so a row is never
    /// half-written.
    async fn update(&self, post: Post) -> Result<Post> {
        let expected = post.revision();
        let mut next = post;
        next.bump_revision();
        let doc = serde_json::to_string(&next).map_err(internal)?;

        let result = sqlx::query(
            "UPDATE posts
             SET doc = ?, category = ?, kind = ?, score = ?, revision = ?
             WHERE id = ? AND revision = ?",
        )
        .bind(doc)
        .bind(next.category())
        .bind(next.kind().as_str())
        .bind(next.score())
        .bind(next.revision() as i64)
        .bind(uuid_to_blob(next.id()))
        .bind(expected as i64)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 1 {
            return Ok(next);
        }

        // Distinguish a stale revision from a deleted post.
        let exists = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
            .bind(uuid_to_blob(next.id()))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;

        if exists.is_some() {
            Err(AppError::Conflict(format!(
                "post {} was modified concurrently",
                next.id()
            )))
        } else {
            Err(AppError::not_found("post", next.id()))
        }
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(AppError::not_found("post", id))
        }
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let rows = match filter {
            PostFilter::All => {
                sqlx::query("SELECT doc FROM posts ORDER BY score DESC")
                    .fetch_all(&self.pool)
                    .await
            }
            PostFilter::Category(category) => {
                sqlx::query("SELECT doc FROM posts WHERE category = ? ORDER BY score DESC")
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await
            }
            PostFilter::Kind(kind) => {
                sqlx::query("SELECT doc FROM posts WHERE kind = ? ORDER BY score DESC")
                    .bind(kind.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            PostFilter::Author(author) => {
                sqlx::query("SELECT doc FROM posts WHERE author = ? ORDER BY created DESC")
                    .bind(uuid_to_blob(*author))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(internal)?;

        rows.into_iter()
            .map(|row| decode_doc(&row.get::<String, _>("doc")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::models::{Ballot, PostDraft, PostKind};

    async fn store() -> SqlitePostStore {
        SqlitePostStore::new("sqlite::memory:").await.unwrap()
    }

    fn post(title: &str, category: &str, kind: PostKind) -> Post {
        Post::create(
            Uuid::now_v7(),
            PostDraft {
                title: title.to_string(),
                url: None,
                text: Some("some body text".to_string()),
                category: category.to_string(),
                kind,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_load_roundtrip() {
        let store = store().await;
        let mut original = post("roundtrip", "general", PostKind::Idea);
        original.vote(Uuid::now_v7(), Ballot::Up);
        original.add_comment(Uuid::now_v7(), "hello").unwrap();

        store.insert(&original).await.unwrap();
        let loaded = store.load(original.id()).await.unwrap();
        assert_eq!(loaded, original);

        let err = store.load(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = store().await;
        let post = post("dup", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();
        let err = store.insert(&post).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let store = store().await;
        let post = post("cas", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();

        let mut first = store.load(post.id()).await.unwrap();
        let mut second = store.load(post.id()).await.unwrap();

        first.vote(Uuid::now_v7(), Ballot::Up);
        let stored = store.update(first).await.unwrap();
        assert_eq!(stored.revision(), 1);

        second.vote(Uuid::now_v7(), Ballot::Down);
        let err = store.update(second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let current = store.load(post.id()).await.unwrap();
        assert_eq!(current.score(), 1);
        assert_eq!(current.revision(), 1);
    }

    #[tokio::test]
    async fn test_update_after_delete_is_not_found() {
        let store = store().await;
        let post = post("gone", "general", PostKind::Idea);
        store.insert(&post).await.unwrap();
        let loaded = store.load(post.id()).await.unwrap();
        store.remove(post.id()).await.unwrap();

        let err = store.update(loaded).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_list_filters_and_sort_orders() {
        let store = store().await;
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

        let ideas = store.list(&PostFilter::Kind(PostKind::Idea)).await.unwrap();
        assert_eq!(ideas.len(), 2);

        let mine = store
            .list(&PostFilter::Author(other.author()))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title(), "other");
    }

    #[tokio::test]
    async fn test_updated_score_column_drives_sorting() {
        let store = store().await;
        let a = post("a", "general", PostKind::Idea);
        let b = post("b", "general", PostKind::Idea);
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        // Vote b up through the CAS path; sorting must see the new score.
        let mut loaded = store.load(b.id()).await.unwrap();
        loaded.vote(Uuid::now_v7(), Ballot::Up);
        store.update(loaded).await.unwrap();

        let all = store.list(&PostFilter::All).await.unwrap();
        assert_eq!(all[0].title(), "b");
    }
}
