//! Reference-marker scanning and name resolution.
//!
//! # Responsibility
//! - Expose pure functions from entry text to resolved/candidate references.
//! - Keep the matching rule identical for live authoring feedback and graph
//!   rebuilds.
//!
//! # Invariants
//! - Resolution is side-effect free; the store is never consulted here.
//! - Matching is case-insensitive and exact after trimming.

pub mod links;
