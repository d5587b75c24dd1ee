//! Live subscription tracking and change-event fan-out.
//!
//! # Responsibility
//! - Track which connection is subscribed to which organization's stream.
//! - Deliver change events to current subscribers, best-effort per
//!   connection.
//!
//! # Invariants
//! - A connection holds at most one subscription at a time.
//! - Delivery never blocks on a slow consumer and never escalates to the
//!   mutation's caller.
//! - No replay: subscribers only see events generated after they joined.

pub mod dispatch;
pub mod registry;
