//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the entry store contract consumed by the service layer.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateName`)
//!   in addition to DB transport errors.
//! - Structural invariants (name uniqueness within a group) are enforced at
//!   write time; identity checks are the access gate's concern, not ours.

pub mod entry_repo;
