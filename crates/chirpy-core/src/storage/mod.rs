//! Storage layer
//!
//! Handles persistence of the collection set.
//!
//! ## Architecture
//!
//! - **Record store**: one JSON file holding every collection, replaced
//!   atomically on each write
//! - **Errors**: I/O failures classified with path context
//!
//! Locking is not done here; see [`crate::store::Store`].

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::RecordStore;
