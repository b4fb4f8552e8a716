//! Repository layer contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the record store contract used by the tool layer.
//! - Isolate SQLite query details from dispatching/serialization.
//!
//! # Invariants
//! - Write paths call `Emotion::validate()` before acquiring a connection.
//! - Every statement is scoped by `user_context`.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod emotion_repo;
mod filter;
