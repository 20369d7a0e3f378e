//! User command handlers

use anyhow::{bail, Context, Result};

use chirpy_core::{SessionManager, SortOrder, UserId};

use crate::output::Output;

/// Register a new user
pub fn create(
    sessions: &SessionManager,
    email: String,
    password: String,
    output: &Output,
) -> Result<()> {
    let user = sessions
        .register(&email, &password)
        .context("Failed to create user")?;

    output.success(&format!("Created user: {}", user.id));
    output.print_user(&user)
}

/// Show a single user
pub fn get(sessions: &SessionManager, id: UserId, output: &Output) -> Result<()> {
    let user = sessions.store().users().get(id)?;
    output.print_user(&user)
}

/// List all users
pub fn list(sessions: &SessionManager, order: SortOrder, output: &Output) -> Result<()> {
    let users = sessions.store().users().list(order)?;
    output.print_users(&users)
}

/// Change email and/or password of a user
pub fn update(
    sessions: &SessionManager,
    id: UserId,
    email: Option<String>,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    if email.is_none() && password.is_none() {
        bail!("Nothing to update. Pass --email and/or --password.");
    }

    let user = sessions
        .change_credentials(id, email.as_deref(), password.as_deref())
        .with_context(|| format!("Failed to update user {}", id))?;

    output.success(&format!("Updated user: {}", user.id));
    output.print_user(&user)
}

/// Mark a user as promoted
pub fn promote(sessions: &SessionManager, id: UserId, output: &Output) -> Result<()> {
    let user = sessions.store().users().promote(id)?;

    output.success(&format!("Promoted user: {}", user.id));
    output.print_user(&user)
}

/// Delete a user and its credential
pub fn delete(sessions: &SessionManager, id: UserId, output: &Output) -> Result<()> {
    sessions
        .store()
        .users()
        .delete(id)
        .with_context(|| format!("Failed to delete user {}", id))?;

    output.success(&format!("Deleted user: {}", id));
    Ok(())
}
