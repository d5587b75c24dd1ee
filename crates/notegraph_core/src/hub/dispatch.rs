//! Best-effort change-event broadcast.
//!
//! # Responsibility
//! - Fan one change event out to every current subscriber of its
//!   organization.
//! - Garbage-collect memberships whose receiver has gone away.
//!
//! # Invariants
//! - Delivery uses non-blocking sends; one slow or dead consumer never
//!   delays the others or the mutation that produced the event.
//! - Per-connection failures are logged and swallowed, never surfaced to
//!   the mutation's caller.

use crate::hub::registry::SubscriptionRegistry;
use crate::model::event::ChangeEvent;
use log::{info, warn};
use tokio::sync::mpsc::error::TrySendError;

/// Subscription registry plus dispatch routine, decoupled from any network
/// transport so fan-out stays testable with plain channels.
#[derive(Debug, Default)]
pub struct EntryHub {
    registry: SubscriptionRegistry,
}

impl EntryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership map, exposed for the connection-lifecycle path.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Delivers `event` to every connection subscribed to its organization.
    ///
    /// Returns the number of queues the event was placed on. Full queues
    /// drop the event for that connection; closed queues additionally drop
    /// the membership.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        let subscribers = self.registry.subscribers_of(&event.org_id);
        let mut delivered = 0usize;

        for (connection_id, sender) in subscribers {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "event=change_broadcast module=hub status=dropped reason=queue_full connection_id={connection_id} org_id={} entry_id={} kind={}",
                        event.org_id,
                        event.entry_id,
                        event.kind.as_str()
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.registry.drop_connection(&connection_id);
                    info!(
                        "event=change_broadcast module=hub status=pruned reason=receiver_closed connection_id={connection_id} org_id={}",
                        event.org_id
                    );
                }
            }
        }

        info!(
            "event=change_broadcast module=hub status=ok org_id={} entry_id={} kind={} delivered={delivered}",
            event.org_id,
            event.entry_id,
            event.kind.as_str()
        );
        delivered
    }
}
