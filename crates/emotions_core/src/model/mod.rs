//! Domain model for the emotions journal.
//!
//! # Responsibility
//! - Define canonical data structures shared by the store and the tool layer.
//!
//! # Invariants
//! - Every record belongs to exactly one non-empty user context.
//! - Deletion is a hard delete; there are no tombstones.

pub mod emotion;
