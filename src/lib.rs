//! Messaging service library.
//!
//! Users, conversations between users, and the messages exchanged in them,
//! served as a JSON API over Axum and stored in SQLite.

pub mod api;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
