//! Post command handlers
//!
//! Writes need an access token; the acting user is its subject.

use anyhow::{Context, Result};

use chirpy_core::{Gate, NewPost, PostFilter, PostId, PostPatch, SortOrder, Store, UserId};

use crate::output::Output;

/// Create a post as the token's user
pub fn create(
    store: &Store,
    gate: &Gate,
    token: String,
    body: String,
    output: &Output,
) -> Result<()> {
    let author = gate.authorize_token(&token)?;

    let post = store
        .posts()
        .create(NewPost::new(author.id, body))
        .context("Failed to create post")?;

    output.success(&format!("Created post: {}", post.id));
    output.print_post(&post)
}

/// Show a single post
pub fn get(store: &Store, id: PostId, output: &Output) -> Result<()> {
    let post = store.posts().get(id)?;
    output.print_post(&post)
}

/// List posts, optionally by one author
pub fn list(
    store: &Store,
    author: Option<UserId>,
    order: SortOrder,
    output: &Output,
) -> Result<()> {
    let filter = match author {
        Some(user_id) => PostFilter::by_user(user_id),
        None => PostFilter::all(),
    };

    let posts = store.posts().list(filter, order)?;
    output.print_posts(&posts)
}

/// Replace the body of one of the token user's posts
pub fn update(
    store: &Store,
    gate: &Gate,
    token: String,
    id: PostId,
    body: String,
    output: &Output,
) -> Result<()> {
    let author = gate.authorize_token(&token)?;

    let post = store
        .posts()
        .update_as(author.id, id, PostPatch { body: Some(body) })
        .with_context(|| format!("Failed to update post {}", id))?;

    output.success(&format!("Updated post: {}", post.id));
    output.print_post(&post)
}

/// Delete one of the token user's posts
pub fn delete(
    store: &Store,
    gate: &Gate,
    token: String,
    id: PostId,
    output: &Output,
) -> Result<()> {
    let author = gate.authorize_token(&token)?;

    store.posts().delete_as(author.id, id)?;

    output.success(&format!("Deleted post: {}", id));
    Ok(())
}
