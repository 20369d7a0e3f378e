//! Login, token refresh and revocation handlers

use anyhow::Result;

use chirpy_core::{Gate, SessionManager};

use crate::output::Output;

/// Log in and print the issued tokens
pub fn login(
    sessions: &SessionManager,
    email: String,
    password: String,
    output: &Output,
) -> Result<()> {
    let session = sessions.login(&email, &password)?;
    output.print_session(&session)
}

/// Trade a refresh token for a new access token
pub fn refresh(sessions: &SessionManager, token: String, output: &Output) -> Result<()> {
    let access_token = sessions.refresh(&token)?;
    output.print_access_token(&access_token)
}

/// Revoke a refresh token
pub fn revoke(sessions: &SessionManager, token: String, output: &Output) -> Result<()> {
    let record = sessions.revoke(&token)?;

    output.success("Refresh token revoked");
    output.print_refresh_token(&record)
}

/// Show the user an access token belongs to
pub fn whoami(gate: &Gate, token: String, output: &Output) -> Result<()> {
    let user = gate.authorize_token(&token)?;
    output.print_user(&user)
}
