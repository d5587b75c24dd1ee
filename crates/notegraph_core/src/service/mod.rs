//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate gate, store, resolver, graph and hub into the mutation and
//!   read surface consumed by the outer API layer.
//! - Serialize mutations per organization so broadcast order matches store
//!   order.

pub mod entry_service;
