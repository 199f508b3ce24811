//! Paperclip Hunt leaderboard backend: one-time game sessions, rate-limited
//! and de-duplicated score submission, and a public top list.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;
