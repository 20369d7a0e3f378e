//! Command handlers

pub mod config;
pub mod post;
pub mod session;
pub mod status;
pub mod user;
