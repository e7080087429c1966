//! # hub-directory-memory
//!
//! Seedable in-memory implementation of `UserDirectory`. The real user
//! directory is an external collaborator; this adapter covers tests,
//! demos, and embedded assemblies.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use hub_core::error::Result;
use hub_core::models::UserProfile;
use hub_core::traits::UserDirectory;

#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<Uuid, UserProfile>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with a fresh id, returning their profile.
    pub fn register(&self, username: &str) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::now_v7(),
            username: username.to_string(),
        };
        self.users.insert(profile.id, profile.clone());
        profile
    }

    pub fn insert(&self, profile: UserProfile) {
        self.users.insert(profile.id, profile);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn lookup(&self, id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_finds_registered_users_only() {
        let directory = MemoryDirectory::new();
        let ada = directory.register("ada");

        let found = directory.lookup(ada.id).await.unwrap();
        assert_eq!(found, Some(ada));

        let missing = directory.lookup(Uuid::now_v7()).await.unwrap();
        assert!(missing.is_none());
    }
}
