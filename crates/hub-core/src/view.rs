//! # Resolved Views
//!
//! What callers actually receive: the aggregate with author references
//! replaced by denormalized directory profiles, storage internals (the
//! revision) stripped, and `upvote_percentage` computed at build time.
//! These are read-time projections, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Participant, Post, PostKind, UserProfile};

/// A denormalized author reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
}

impl From<UserProfile> for AuthorView {
    fn from(profile: UserProfile) -> Self {
        AuthorView {
            id: profile.id,
            username: profile.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteView {
    pub user: Uuid,
    pub vote: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub user: Uuid,
    pub name: String,
    pub role: String,
    pub contribution: String,
    pub joined: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub author: AuthorView,
    pub body: String,
    pub created: DateTime<Utc>,
}

/// The fully resolved post returned by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub author: AuthorView,
    pub category: String,
    pub kind: PostKind,
    pub score: i64,
    pub upvote_percentage: u32,
    pub votes: Vec<VoteView>,
    pub participants: Vec<ParticipantView>,
    pub comments: Vec<CommentView>,
    pub created: DateTime<Utc>,
    pub views: u64,
}

impl PostView {
    /// Assembles the view from an aggregate plus already-resolved authors.
    /// `comment_authors` must be ordered one-to-one with the post's
    /// comments; the resolver owns the directory round trips.
    pub fn assemble(post: &Post, author: AuthorView, comment_authors: Vec<AuthorView>) -> PostView {
        debug_assert_eq!(post.comments().len(), comment_authors.len());
        PostView {
            id: post.id(),
            title: post.title().to_string(),
            url: post.url().map(str::to_string),
            text: post.text().map(str::to_string),
            author,
            category: post.category().to_string(),
            kind: post.kind(),
            score: post.score(),
            upvote_percentage: post.votes().upvote_percentage(),
            votes: post
                .votes()
                .iter()
                .map(|(user, vote)| VoteView {
                    user: *user,
                    vote: vote.value() as i8,
                })
                .collect(),
            participants: post
                .participants()
                .iter()
                .map(|(user, p)| participant_view(*user, p))
                .collect(),
            comments: post
                .comments()
                .iter()
                .zip(comment_authors)
                .map(|(c, author)| comment_view(c, author))
                .collect(),
            created: post.created(),
            views: post.views(),
        }
    }
}

fn participant_view(user: Uuid, p: &Participant) -> ParticipantView {
    ParticipantView {
        user,
        name: p.name.clone(),
        role: p.role.clone(),
        contribution: p.contribution.clone(),
        joined: p.joined,
    }
}

fn comment_view(c: &Comment, author: AuthorView) -> CommentView {
    CommentView {
        id: c.id,
        author,
        body: c.body.clone(),
        created: c.created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ballot, PostDraft};

    fn post_with_votes() -> Post {
        let author = Uuid::now_v7();
        let mut post = Post::create(
            author,
            PostDraft {
                title: "Title".to_string(),
                url: Some("https://example.com".to_string()),
                text: Some("some body text".to_string()),
                category: "general".to_string(),
                kind: PostKind::Idea,
            },
        )
        .unwrap();
        post.vote(author, Ballot::Up);
        post.vote(Uuid::now_v7(), Ballot::Down);
        post
    }

    #[test]
    fn serialized_view_strips_storage_internals() {
        let post = post_with_votes();
        let author = AuthorView {
            id: post.author(),
            username: "ada".to_string(),
        };
        let view = PostView::assemble(&post, author, Vec::new());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("revision").is_none());
        assert_eq!(json["upvote_percentage"], 50);
        assert_eq!(json["score"], 0);
        assert_eq!(json["author"]["username"], "ada");
        assert_eq!(json["votes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let mut post = post_with_votes();
        post.change_kind(PostKind::Project);
        let author = AuthorView {
            id: post.author(),
            username: "ada".to_string(),
        };
        let view = PostView {
            url: None,
            ..PostView::assemble(&post, author, Vec::new())
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("url").is_none());
        assert_eq!(json["kind"], "project");
    }
}
