//! Domain layer types and invariants.

pub mod categories;
pub mod entities;
pub mod error;
pub mod permissions;
pub mod schedule;
pub mod slug;
pub mod tags;
pub mod types;
