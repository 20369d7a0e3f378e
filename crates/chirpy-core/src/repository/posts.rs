//! Post repository

use chrono::Utc;
use tracing::debug;

use super::require_non_empty;
use crate::error::{Error, Result};
use crate::models::{NewPost, Post, PostFilter, PostId, PostPatch, SortOrder, UserId, MAX_POST_LENGTH};
use crate::store::Store;

/// CRUD operations on posts
#[derive(Debug, Clone)]
pub struct PostRepository {
    store: Store,
}

impl PostRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a post for an existing user
    ///
    /// Fails with `NotFound` if the author does not exist and with
    /// `Validation` if the body is empty or too long.
    pub fn create(&self, new_post: NewPost) -> Result<Post> {
        validate_body(&new_post.body)?;

        let post = self.store.write(|set| {
            if !set.users.contains_key(&new_post.user_id) {
                return Err(Error::not_found("user", new_post.user_id));
            }

            let now = Utc::now();
            let post = Post {
                id: set.next_post_id(),
                body: new_post.body,
                user_id: new_post.user_id,
                created_at: now,
                updated_at: now,
            };
            set.posts.insert(post.id, post.clone());
            Ok(post)
        })?;

        debug!("Created post {} for user {}", post.id, post.user_id);
        Ok(post)
    }

    /// Get a post by ID
    pub fn get(&self, id: PostId) -> Result<Post> {
        self.store.read(|set| {
            set.posts
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::not_found("post", id))
        })
    }

    /// List posts matching `filter`, ordered by ID
    pub fn list(&self, filter: PostFilter, order: SortOrder) -> Result<Vec<Post>> {
        self.store.read(|set| {
            Ok(order.apply(
                set.posts
                    .values()
                    .filter(|post| filter.matches(post))
                    .cloned(),
            ))
        })
    }

    /// Apply `patch` to an existing post
    pub fn update(&self, id: PostId, patch: PostPatch) -> Result<Post> {
        self.apply_patch(None, id, patch)
    }

    /// Apply `patch` on behalf of `user_id`
    ///
    /// Only the author may edit a post; anyone else gets `Forbidden` and the
    /// post is left as it was.
    pub fn update_as(&self, user_id: UserId, id: PostId, patch: PostPatch) -> Result<Post> {
        let post = self.apply_patch(Some(user_id), id, patch)?;
        debug!("User {} updated post {}", user_id, id);
        Ok(post)
    }

    fn apply_patch(&self, author: Option<UserId>, id: PostId, patch: PostPatch) -> Result<Post> {
        if let Some(ref body) = patch.body {
            validate_body(body)?;
        }

        self.store.write(|set| {
            let post = set
                .posts
                .get_mut(&id)
                .ok_or_else(|| Error::not_found("post", id))?;
            if let Some(user_id) = author {
                ensure_author(post, user_id)?;
            }

            if let Some(body) = patch.body {
                post.body = body;
                post.updated_at = Utc::now();
            }
            Ok(post.clone())
        })
    }

    /// Delete a post
    pub fn delete(&self, id: PostId) -> Result<()> {
        self.store.write(|set| {
            set.posts
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| Error::not_found("post", id))
        })?;

        debug!("Deleted post {}", id);
        Ok(())
    }

    /// Delete a post on behalf of `user_id`
    ///
    /// Only the author may delete a post; anyone else gets `Forbidden`.
    pub fn delete_as(&self, user_id: UserId, id: PostId) -> Result<()> {
        self.store.write(|set| {
            let post = set.posts.get(&id).ok_or_else(|| Error::not_found("post", id))?;
            ensure_author(post, user_id)?;
            set.posts.remove(&id);
            Ok(())
        })?;

        debug!("User {} deleted post {}", user_id, id);
        Ok(())
    }
}

fn ensure_author(post: &Post, user_id: UserId) -> Result<()> {
    if post.user_id != user_id {
        return Err(Error::Forbidden(format!(
            "user {} is not the author of post {}",
            user_id, post.id
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<()> {
    require_non_empty("post body", body)?;

    let length = body.chars().count();
    if length > MAX_POST_LENGTH {
        return Err(Error::Validation(format!(
            "post is too long: {} characters, max {}",
            length, MAX_POST_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PasswordHash;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> Store {
        Store::open_path(temp_dir.path().join("database.json")).unwrap()
    }

    fn add_user(store: &Store, email: &str) -> UserId {
        store
            .users()
            .create(email, PasswordHash::new("$argon2id$test".to_string()))
            .unwrap()
            .id
    }

    #[test]
    fn test_create_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");

        let post = store.posts().create(NewPost::new(user_id, "hello world")).unwrap();
        assert_eq!(post.id, 1);
        assert_eq!(post.body, "hello world");
        assert_eq!(post.user_id, user_id);
        assert_eq!(post.created_at, post.updated_at);

        let fetched = store.posts().get(post.id).unwrap();
        assert_eq!(fetched, post);
    }

    #[test]
    fn test_create_requires_existing_user() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let err = store.posts().create(NewPost::new(99, "orphan")).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
        assert_eq!(store.stats().unwrap().posts, 0);
    }

    #[test]
    fn test_create_validates_body() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");

        let err = store.posts().create(NewPost::new(user_id, "   ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let long = "x".repeat(MAX_POST_LENGTH + 1);
        let err = store.posts().create(NewPost::new(user_id, long)).unwrap_err();
        assert!(err.to_string().contains("too long"));

        let exact = "é".repeat(MAX_POST_LENGTH);
        assert!(store.posts().create(NewPost::new(user_id, exact)).is_ok());
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let err = store.posts().get(1).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "post", .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_returned_post_is_a_copy() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");

        let mut post = store.posts().create(NewPost::new(user_id, "original")).unwrap();
        post.body = "changed locally".to_string();

        assert_eq!(store.posts().get(post.id).unwrap().body, "original");
    }

    #[test]
    fn test_back_to_back_posts_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");
        let posts = store.posts();

        let first = posts.create(NewPost::new(user_id, "first")).unwrap();
        let second = posts.create(NewPost::new(user_id, "second")).unwrap();
        assert!(second.id > first.id);

        let ascending = posts.list(PostFilter::all(), SortOrder::Ascending).unwrap();
        let bodies: Vec<_> = ascending.iter().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);

        let descending = posts.list(PostFilter::all(), SortOrder::Descending).unwrap();
        let bodies: Vec<_> = descending.iter().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, vec!["second", "first"]);

        let default_order = posts.list(PostFilter::default(), SortOrder::default()).unwrap();
        assert_eq!(default_order, ascending);
    }

    #[test]
    fn test_list_filters_by_user() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let alice = add_user(&store, "alice@x.com");
        let bob = add_user(&store, "bob@x.com");
        let posts = store.posts();

        posts.create(NewPost::new(alice, "a1")).unwrap();
        posts.create(NewPost::new(bob, "b1")).unwrap();
        posts.create(NewPost::new(alice, "a2")).unwrap();

        let alice_posts = posts.list(PostFilter::by_user(alice), SortOrder::Ascending).unwrap();
        assert_eq!(alice_posts.len(), 2);
        assert!(alice_posts.iter().all(|p| p.user_id == alice));

        let nobody = posts.list(PostFilter::by_user(42), SortOrder::Ascending).unwrap();
        assert!(nobody.is_empty());
    }

    #[test]
    fn test_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");
        let post = store.posts().create(NewPost::new(user_id, "draft")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = store
            .posts()
            .update(
                post.id,
                PostPatch {
                    body: Some("final".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.body, "final");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at > post.updated_at);
        assert_eq!(store.posts().get(post.id).unwrap().body, "final");
    }

    #[test]
    fn test_update_missing_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");
        let post = store.posts().create(NewPost::new(user_id, "draft")).unwrap();

        let err = store.posts().update(7, PostPatch::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = store
            .posts()
            .update(
                post.id,
                PostPatch {
                    body: Some(String::new()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.posts().get(post.id).unwrap().body, "draft");
    }

    #[test]
    fn test_delete_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");
        let post = store.posts().create(NewPost::new(user_id, "bye")).unwrap();

        store.posts().delete(post.id).unwrap();
        assert!(matches!(
            store.posts().get(post.id).unwrap_err(),
            Error::NotFound { .. }
        ));

        let err = store.posts().delete(post.id).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let user_id = add_user(&store, "a@x.com");
        let posts = store.posts();

        let first = posts.create(NewPost::new(user_id, "one")).unwrap();
        let second = posts.create(NewPost::new(user_id, "two")).unwrap();
        posts.delete(second.id).unwrap();

        let third = posts.create(NewPost::new(user_id, "three")).unwrap();
        assert!(third.id > second.id);
        assert_ne!(third.id, first.id);
    }

    #[test]
    fn test_delete_as_author_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let alice = add_user(&store, "alice@x.com");
        let bob = add_user(&store, "bob@x.com");
        let post = store.posts().create(NewPost::new(alice, "mine")).unwrap();

        let err = store.posts().delete_as(bob, post.id).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(err.status_code(), 403);
        assert!(store.posts().get(post.id).is_ok());

        store.posts().delete_as(alice, post.id).unwrap();
        let err = store.posts().delete_as(alice, post.id).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_update_as_author_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let alice = add_user(&store, "alice@x.com");
        let bob = add_user(&store, "bob@x.com");
        let post = store.posts().create(NewPost::new(alice, "mine")).unwrap();

        let err = store
            .posts()
            .update_as(
                bob,
                post.id,
                PostPatch {
                    body: Some("hijacked".to_string()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(err.status_code(), 403);

        let unchanged = store.posts().get(post.id).unwrap();
        assert_eq!(unchanged.body, "mine");
        assert_eq!(unchanged.updated_at, post.updated_at);

        let updated = store
            .posts()
            .update_as(
                alice,
                post.id,
                PostPatch {
                    body: Some("still mine".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.body, "still mine");

        let err = store
            .posts()
            .update_as(alice, 99, PostPatch::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
