//! # Domain Models
//!
//! The `Post` aggregate and its embedded collections. The aggregate is the
//! consistency boundary: votes, participants, and comments are value
//! collections owned exclusively by their post and mutated only through the
//! methods here, so the score invariant (`score == sum of vote values`)
//! cannot be broken from outside.
//!
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Placeholder contribution text stored on join. Real contribution text is
/// only ever set through `change_contribution`.
pub const DEFAULT_CONTRIBUTION: &str = "No contributions yet";

const MAX_TITLE_LEN: usize = 100;
const MIN_TEXT_LEN: usize = 4;

/// Classification of a post. Both transitions are unconditional: an idea can
/// be upgraded to a project and downgraded back at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Idea,
    Project,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Idea => "idea",
            PostKind::Project => "project",
        }
    }
}

impl std::str::FromStr for PostKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idea" => Ok(PostKind::Idea),
            "project" => Ok(PostKind::Project),
            other => Err(AppError::Validation(format!(
                "kind must be idea or project, got {other:?}"
            ))),
        }
    }
}

/// A stored vote value. Zero is never stored; retracting a vote deletes the
/// entry instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn value(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(v: VoteValue) -> i8 {
        v.value() as i8
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = String;

    fn try_from(raw: i8) -> std::result::Result<Self, String> {
        match raw {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(format!("vote value must be -1 or 1, got {other}")),
        }
    }
}

/// A ballot cast against a post: up, down, or retract (the wire value 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ballot {
    Up,
    Down,
    Retract,
}

impl Ballot {
    /// The vote entry this ballot leaves behind, if any.
    pub fn vote(self) -> Option<VoteValue> {
        match self {
            Ballot::Up => Some(VoteValue::Up),
            Ballot::Down => Some(VoteValue::Down),
            Ballot::Retract => None,
        }
    }
}

/// Per-user vote entries plus the running score.
///
/// The score is kept alongside the entries (rather than recomputed on read)
/// because list queries sort on it; `cast` is the only mutation path, so the
/// two cannot drift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    entries: BTreeMap<Uuid, VoteValue>,
    score: i64,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a ballot for `user`, maintaining `score == sum(entries)`.
    ///
    /// An existing entry is first backed out of the score, then replaced or
    /// deleted. Casting the same non-zero ballot twice is a no-op after the
    /// second call; retracting with no prior vote is a no-op outright.
    pub fn cast(&mut self, user: Uuid, ballot: Ballot) {
        let prior = self.entries.get(&user).copied();
        match (prior, ballot.vote()) {
            (Some(old), None) => {
                self.score -= old.value();
                self.entries.remove(&user);
            }
            (Some(old), Some(next)) => {
                self.score += next.value() - old.value();
                self.entries.insert(user, next);
            }
            (None, Some(next)) => {
                self.score += next.value();
                self.entries.insert(user, next);
            }
            (None, None) => {}
        }
        debug_assert_eq!(self.score, self.tally());
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn entry(&self, user: Uuid) -> Option<VoteValue> {
        self.entries.get(&user).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &VoteValue)> {
        self.entries.iter()
    }

    /// `floor(100 * upvotes / total)` over entry counts; 0 when no votes.
    pub fn upvote_percentage(&self) -> u32 {
        let total = self.entries.len() as u32;
        if total == 0 {
            return 0;
        }
        let upvotes = self
            .entries
            .values()
            .filter(|v| matches!(v, VoteValue::Up))
            .count() as u32;
        upvotes * 100 / total
    }

    /// Recomputed sum of all entries; equals `score()` at all times.
    pub fn tally(&self) -> i64 {
        self.entries.values().map(|v| v.value()).sum()
    }
}

/// A roster entry: who joined, under what role, and what they contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub role: String,
    pub contribution: String,
    pub joined: DateTime<Utc>,
}

/// Per-user membership entries, at most one per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRoster {
    entries: BTreeMap<Uuid, Participant>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry with the placeholder contribution text. If the user
    /// already joined this is a no-op and the submitted role is discarded.
    /// Returns whether an entry was inserted.
    pub fn join(&mut self, user: Uuid, name: &str, role: &str) -> bool {
        if self.entries.contains_key(&user) {
            return false;
        }
        self.entries.insert(
            user,
            Participant {
                name: name.to_string(),
                role: role.to_string(),
                contribution: DEFAULT_CONTRIBUTION.to_string(),
                joined: Utc::now(),
            },
        );
        true
    }

    /// Removes the entry for `user` if present. Silent no-op otherwise.
    pub fn leave(&mut self, user: Uuid) -> bool {
        self.entries.remove(&user).is_some()
    }

    /// Overwrites role and contribution text for an existing member.
    /// Silent no-op for non-members.
    pub fn set_contribution(&mut self, user: Uuid, role: &str, contribution: &str) -> bool {
        match self.entries.get_mut(&user) {
            Some(entry) => {
                entry.role = role.to_string();
                entry.contribution = contribution.to_string();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, user: Uuid) -> Option<&Participant> {
        self.entries.get(&user)
    }

    pub fn contains(&self, user: Uuid) -> bool {
        self.entries.contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Participant)> {
        self.entries.iter()
    }
}

/// A single comment. Carries its own id so it can be targeted for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub author: Uuid,
    pub body: String,
    pub created: DateTime<Utc>,
}

/// Ordered comment sequence. Append-only ordering: removals never re-sort
/// the remaining entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    entries: Vec<Comment>,
}

impl CommentThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a comment with a fresh v7 id, returning that id.
    pub fn add(&mut self, author: Uuid, body: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.entries.push(Comment {
            id,
            author,
            body: body.to_string(),
            created: Utc::now(),
        });
        id
    }

    /// Removes the comment with the given id, preserving the relative order
    /// of the rest. Unknown ids are an error.
    pub fn remove(&mut self, id: Uuid) -> Result<()> {
        match self.entries.iter().position(|c| c.id == id) {
            Some(idx) => {
                self.entries.remove(idx);
                Ok(())
            }
            None => Err(AppError::not_found("comment", id)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.entries.iter()
    }
}

/// Caller-supplied fields for creating a post. The author comes from the
/// identity context, never from the draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
    pub category: String,
    pub kind: PostKind,
}

/// The post aggregate. All fields are private: external code mutates a post
/// only through the operation methods, which is what keeps the embedded
/// collections and the score consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    id: Uuid,
    title: String,
    url: Option<String>,
    text: Option<String>,
    author: Uuid,
    category: String,
    kind: PostKind,
    votes: VoteLedger,
    participants: ParticipantRoster,
    comments: CommentThread,
    created: DateTime<Utc>,
    views: u64,
    /// Storage CAS token; bumped by the store on every successful write.
    /// Stripped from every serialized view.
    revision: u64,
}

impl Post {
    /// Validates a draft and builds a fresh aggregate with an empty ledger,
    /// roster, and thread. The automatic author upvote is the lifecycle
    /// pipeline's job, not the constructor's.
    pub fn create(author: Uuid, draft: PostDraft) -> Result<Post> {
        validate_draft(&draft)?;
        Ok(Post {
            id: Uuid::now_v7(),
            title: draft.title,
            url: draft.url,
            text: draft.text,
            author,
            category: draft.category,
            kind: draft.kind,
            votes: VoteLedger::new(),
            participants: ParticipantRoster::new(),
            comments: CommentThread::new(),
            created: Utc::now(),
            views: 0,
            revision: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn author(&self) -> Uuid {
        self.author
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn kind(&self) -> PostKind {
        self.kind
    }

    pub fn votes(&self) -> &VoteLedger {
        &self.votes
    }

    pub fn participants(&self) -> &ParticipantRoster {
        &self.participants
    }

    pub fn comments(&self) -> &CommentThread {
        &self.comments
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn views(&self) -> u64 {
        self.views
    }

    pub fn score(&self) -> i64 {
        self.votes.score()
    }

    /// For storage adapters: the revision this in-memory copy was loaded at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// For storage adapters: marks a successful compare-and-swap write.
    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Casts a ballot for `user`. See [`VoteLedger::cast`].
    pub fn vote(&mut self, user: Uuid, ballot: Ballot) {
        self.votes.cast(user, ballot);
    }

    /// Adds `user` to the roster; idempotent. The display name is captured
    /// at join time from the directory profile.
    pub fn join(&mut self, user: &UserProfile, role: &str) -> bool {
        self.participants.join(user.id, &user.username, role)
    }

    /// Removes `user` from the roster; silent no-op for non-members.
    pub fn leave(&mut self, user: Uuid) -> bool {
        self.participants.leave(user)
    }

    /// Updates a member's role and contribution text; silent no-op for
    /// non-members.
    pub fn change_contribution(&mut self, user: Uuid, role: &str, contribution: &str) -> bool {
        self.participants.set_contribution(user, role, contribution)
    }

    /// Appends a comment and returns its id.
    pub fn add_comment(&mut self, author: Uuid, body: &str) -> Result<Uuid> {
        if body.trim().is_empty() {
            return Err(AppError::Validation("comment body cannot be blank".into()));
        }
        Ok(self.comments.add(author, body))
    }

    /// Removes a comment by id; `NotFound` if no such comment exists.
    pub fn remove_comment(&mut self, id: Uuid) -> Result<()> {
        self.comments.remove(id)
    }

    /// Sets the classification unconditionally; no guard against redundant
    /// transitions to the current value.
    pub fn change_kind(&mut self, kind: PostKind) {
        self.kind = kind;
    }

    /// Bumps the monotonic view counter.
    pub fn record_view(&mut self) {
        self.views += 1;
    }
}

fn validate_draft(draft: &PostDraft) -> Result<()> {
    if draft.title.is_empty() {
        return Err(AppError::Validation("title cannot be blank".into()));
    }
    if draft.title.len() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters long"
        )));
    }
    if draft.title.trim() != draft.title {
        return Err(AppError::Validation(
            "title cannot start or end with whitespace".into(),
        ));
    }
    match &draft.text {
        Some(text) if text.len() >= MIN_TEXT_LEN => {}
        Some(_) => {
            return Err(AppError::Validation(format!(
                "text must be at least {MIN_TEXT_LEN} characters long"
            )))
        }
        None => return Err(AppError::Validation("text is required".into())),
    }
    if draft.category.is_empty() {
        return Err(AppError::Validation("category cannot be blank".into()));
    }
    Ok(())
}

/// A resolved user identity from the directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
}
