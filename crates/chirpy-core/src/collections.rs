//! The persisted collection set
//!
//! Everything the service stores lives in one [`CollectionSet`]: four keyed
//! collections plus the identifier sequences. The whole set is decoded on
//! load and re-encoded wholesale on every write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Credential, Post, PostId, RefreshToken, User, UserId};

/// Last identifiers handed out per collection
///
/// Kept separately from the records so that deleting the newest record
/// never frees its identifier for reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(default)]
    pub posts: u64,
    #[serde(default)]
    pub users: u64,
}

/// All collections kept in the record store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSet {
    #[serde(default)]
    pub posts: BTreeMap<PostId, Post>,
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub credentials: BTreeMap<UserId, Credential>,
    #[serde(default)]
    pub refresh_tokens: BTreeMap<String, RefreshToken>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl CollectionSet {
    /// Create an empty collection set
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next post identifier
    pub(crate) fn next_post_id(&mut self) -> PostId {
        let highest = self.posts.keys().next_back().copied().unwrap_or(0);
        self.sequences.posts = self.sequences.posts.max(highest) + 1;
        self.sequences.posts
    }

    /// Reserve the next user identifier
    pub(crate) fn next_user_id(&mut self) -> UserId {
        let highest = self.users.keys().next_back().copied().unwrap_or(0);
        self.sequences.users = self.sequences.users.max(highest) + 1;
        self.sequences.users
    }

    /// Find a user by email
    pub(crate) fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    /// Record counts per collection
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            posts: self.posts.len(),
            users: self.users.len(),
            credentials: self.credentials.len(),
            refresh_tokens: self.refresh_tokens.len(),
        }
    }
}

/// Number of records in each collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub posts: usize,
    pub users: usize,
    pub credentials: usize,
    pub refresh_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(id: PostId) -> Post {
        let now = Utc::now();
        Post {
            id,
            body: format!("post {}", id),
            user_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut set = CollectionSet::new();
        assert_eq!(set.next_post_id(), 1);
        assert_eq!(set.next_post_id(), 2);
        assert_eq!(set.next_user_id(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut set = CollectionSet::new();
        let id = set.next_post_id();
        set.posts.insert(id, post(id));
        set.posts.remove(&id);

        assert_eq!(set.next_post_id(), id + 1);
    }

    #[test]
    fn test_ids_skip_past_existing_records() {
        let mut set = CollectionSet::new();
        set.posts.insert(41, post(41));

        assert_eq!(set.next_post_id(), 42);
    }

    #[test]
    fn test_missing_collections_decode_as_empty() {
        let set: CollectionSet = serde_json::from_str("{}").unwrap();
        assert_eq!(set, CollectionSet::new());

        let set: CollectionSet = serde_json::from_str(r#"{"posts": {}}"#).unwrap();
        assert!(set.users.is_empty());
    }

    #[test]
    fn test_integer_keys_survive_json() {
        let mut set = CollectionSet::new();
        let id = set.next_post_id();
        set.posts.insert(id, post(id));

        let json = serde_json::to_string(&set).unwrap();
        let back: CollectionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.posts.get(&1).unwrap().body, "post 1");
        assert_eq!(back.sequences.posts, 1);
    }
}
