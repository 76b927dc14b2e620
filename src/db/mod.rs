//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `actor.rs`: ractor actor owning the pool; all access goes through its handle

pub mod actor;
pub mod models;
pub mod schema;

pub use actor::{DbActorHandle, MessageCreate, ParentalUpdate, SessionCreate, spawn};
pub use models::{DbChatMessage, DbChatSession, DbParentalControls, DbUserProgress};
pub use schema::SQLITE_INIT;
