//! Chirpy Core Library
//!
//! This crate provides the core of Chirpy, a small social-post service:
//! a persistent record store shared safely between concurrent workers, and
//! the session lifecycle that guards writes to it.
//!
//! # Architecture
//!
//! - **Record store**: one JSON file holding every collection, replaced
//!   atomically on each write
//! - **Store**: pairs the file with a process-wide reader/writer lock and
//!   hands out typed repositories
//! - **Auth**: Argon2id password hashes, HS256 access tokens and opaque,
//!   revocable refresh tokens
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Store::open(&config)?;
//! let sessions = SessionManager::new(store.clone(), &config);
//!
//! let user = sessions.register("a@x.com", "secret123")?;
//! let session = sessions.login("a@x.com", "secret123")?;
//!
//! let author = Gate::new(sessions).authorize_token(&session.access_token)?;
//! store.posts().create(NewPost::new(author.id, "hello"))?;
//! ```
//!
//! # Modules
//!
//! - `store`: guarded access to the record store (main entry point)
//! - `repository`: typed CRUD per collection
//! - `auth`: credentials, tokens, sessions and request authorization
//! - `models`: records and request shapes
//! - `collections`: the persisted collection set
//! - `storage`: on-disk persistence
//! - `config`: application configuration

pub mod auth;
pub mod collections;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod storage;
pub mod store;

pub use auth::{CredentialManager, Gate, Session, SessionManager};
pub use collections::{CollectionSet, CollectionStats};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{
    NewPost, PasswordHash, Post, PostFilter, PostId, PostPatch, RefreshToken, SortOrder,
    TokenState, User, UserId, UserPatch,
};
pub use repository::{PostRepository, RefreshTokenRepository, UserRepository};
pub use storage::{RecordStore, StorageError};
pub use store::Store;
