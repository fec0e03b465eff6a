//! Core data models for the image catalog service.
//!
//! These entities represent catalogued image records and the accounts that
//! own them. They map cleanly to database tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`.

pub mod image;
pub mod user;
