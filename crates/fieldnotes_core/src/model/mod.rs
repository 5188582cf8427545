//! Fieldnote domain model.
//!
//! # Responsibility
//! - Define the canonical note record, address helpers and corpus snapshot.
//! - Keep the model free of I/O so parsing/validation stay pure.
//!
//! # Invariants
//! - Every note is identified by a stable uid.
//! - Derived views (link map, lookups) are rebuilt from a full snapshot.

pub mod address;
pub mod corpus;
pub mod note;
