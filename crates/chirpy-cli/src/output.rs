//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use chirpy_core::{CollectionStats, Post, RefreshToken, Session, User};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
        println!("{}", json);
        Ok(())
    }

    /// Print a single user
    pub fn print_user(&self, user: &User) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", user.id);
                println!("Email:    {}", user.email);
                println!("Promoted: {}", if user.is_promoted { "yes" } else { "no" });
                println!("Created:  {}", user.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", user.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => self.print_json(user)?,
            OutputFormat::Quiet => println!("{}", user.id),
        }
        Ok(())
    }

    /// Print a list of users
    pub fn print_users(&self, users: &[User]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if users.is_empty() {
                    println!("No users found.");
                    return Ok(());
                }
                for user in users {
                    let marker = if user.is_promoted { " *" } else { "" };
                    println!("{:>6} | {}{}", user.id, user.email, marker);
                }
                println!("\n{} user(s)", users.len());
            }
            OutputFormat::Json => self.print_json(users)?,
            OutputFormat::Quiet => {
                for user in users {
                    println!("{}", user.id);
                }
            }
        }
        Ok(())
    }

    /// Print a single post
    pub fn print_post(&self, post: &Post) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", post.id);
                println!("Author:  {}", post.user_id);
                println!("Created: {}", post.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated: {}", post.updated_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", post.body);
            }
            OutputFormat::Json => self.print_json(post)?,
            OutputFormat::Quiet => println!("{}", post.id),
        }
        Ok(())
    }

    /// Print a list of posts
    pub fn print_posts(&self, posts: &[Post]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if posts.is_empty() {
                    println!("No posts found.");
                    return Ok(());
                }
                for post in posts {
                    println!(
                        "{:>6} | {:>6} | {} | {}",
                        post.id,
                        post.user_id,
                        post.created_at.format("%Y-%m-%d %H:%M"),
                        truncate_line(&post.body, 60)
                    );
                }
                println!("\n{} post(s)", posts.len());
            }
            OutputFormat::Json => self.print_json(posts)?,
            OutputFormat::Quiet => {
                for post in posts {
                    println!("{}", post.id);
                }
            }
        }
        Ok(())
    }

    /// Print the tokens of a fresh login
    pub fn print_session(&self, session: &Session) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Logged in as {} (user {})", session.user.email, session.user.id);
                println!();
                println!("Access token:  {}", session.access_token);
                println!("Refresh token: {}", session.refresh_token.token);
                println!(
                    "Refresh token expires: {}",
                    session.refresh_token.expires_at.format("%Y-%m-%d %H:%M")
                );
            }
            OutputFormat::Json => self.print_json(session)?,
            OutputFormat::Quiet => println!("{}", session.access_token),
        }
        Ok(())
    }

    /// Print a newly minted access token
    pub fn print_access_token(&self, token: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", token),
            OutputFormat::Json => self.print_json(&serde_json::json!({ "token": token }))?,
        }
        Ok(())
    }

    /// Print a refresh token record
    pub fn print_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("User:    {}", token.user_id);
                println!("Created: {}", token.created_at.format("%Y-%m-%d %H:%M"));
                println!("Expires: {}", token.expires_at.format("%Y-%m-%d %H:%M"));
                match token.revoked_at {
                    Some(at) => println!("Revoked: {}", at.format("%Y-%m-%d %H:%M")),
                    None => println!("Revoked: no"),
                }
            }
            OutputFormat::Json => self.print_json(token)?,
            OutputFormat::Quiet => {}
        }
        Ok(())
    }

    /// Print record counts
    pub fn print_stats(&self, location: &str, stats: &CollectionStats) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Chirpy Status");
                println!("=============");
                println!();
                println!("Store: {}", location);
                println!();
                println!("Contents:");
                println!("  Users:          {}", stats.users);
                println!("  Credentials:    {}", stats.credentials);
                println!("  Posts:          {}", stats.posts);
                println!("  Refresh tokens: {}", stats.refresh_tokens);
            }
            OutputFormat::Json => self.print_json(&serde_json::json!({
                "store": location,
                "counts": stats,
            }))?,
            OutputFormat::Quiet => println!("{}", location),
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
