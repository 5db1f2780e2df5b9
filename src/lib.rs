//! # blog-auth
//!
//! Email/password authentication service for the blog: axum routes under
//! `/api/auth`, diesel-backed persistence of users, accounts, sessions,
//! verifications and posts, and a database health check at `/api/db`.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
