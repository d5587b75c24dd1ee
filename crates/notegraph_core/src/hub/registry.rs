//! Connection-to-organization subscription registry.
//!
//! # Responsibility
//! - Own the concurrent membership map shared by the connection-lifecycle
//!   path and the broadcast path.
//! - Hand out membership snapshots so delivery happens outside any shard
//!   guard.
//!
//! # Invariants
//! - One connection maps to at most one organization.
//! - Subscribe is idempotent; subscribing elsewhere replaces the prior
//!   membership.
//! - Unsubscribe/removal of an absent membership is a no-op, not an error.

use crate::model::event::ChangeEvent;
use dashmap::DashMap;
use log::info;
use tokio::sync::mpsc;

/// Default per-subscriber delivery queue depth.
///
/// Deep enough to absorb bursts; a consumer that falls further behind loses
/// events rather than stalling the organization's broadcast.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// One live membership record.
#[derive(Debug, Clone)]
struct Subscription {
    org_id: String,
    sender: mpsc::Sender<ChangeEvent>,
}

/// Outcome of a subscribe call, mostly useful for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The connection had no prior membership.
    Subscribed,
    /// The connection was already subscribed to this organization; the
    /// delivery channel was refreshed.
    Refreshed,
    /// The connection moved from another organization.
    Replaced { previous_org: String },
}

/// Concurrent subscription membership map.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    members: DashMap<String, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a delivery channel sized for registry subscribers.
    pub fn channel() -> (mpsc::Sender<ChangeEvent>, mpsc::Receiver<ChangeEvent>) {
        mpsc::channel(DEFAULT_QUEUE_CAPACITY)
    }

    /// Subscribes one connection to one organization's stream.
    ///
    /// Replaces any prior membership of the same connection.
    pub fn subscribe(
        &self,
        connection_id: &str,
        org_id: &str,
        sender: mpsc::Sender<ChangeEvent>,
    ) -> SubscribeOutcome {
        let previous = self.members.insert(
            connection_id.to_string(),
            Subscription {
                org_id: org_id.to_string(),
                sender,
            },
        );

        let outcome = match previous {
            None => SubscribeOutcome::Subscribed,
            Some(old) if old.org_id == org_id => SubscribeOutcome::Refreshed,
            Some(old) => SubscribeOutcome::Replaced {
                previous_org: old.org_id,
            },
        };

        info!(
            "event=hub_subscribe module=hub status=ok connection_id={connection_id} org_id={org_id} outcome={outcome:?}"
        );
        outcome
    }

    /// Removes one membership if the connection is subscribed to `org_id`.
    ///
    /// Returns whether a membership was removed; a mismatched or absent
    /// membership is left untouched.
    pub fn unsubscribe(&self, connection_id: &str, org_id: &str) -> bool {
        let removed = self
            .members
            .remove_if(connection_id, |_, subscription| {
                subscription.org_id == org_id
            })
            .is_some();

        if removed {
            info!(
                "event=hub_unsubscribe module=hub status=ok connection_id={connection_id} org_id={org_id}"
            );
        }
        removed
    }

    /// Removes whatever membership the connection holds.
    ///
    /// Called when the connection terminates so membership never leaks.
    pub fn drop_connection(&self, connection_id: &str) -> Option<String> {
        let removed = self
            .members
            .remove(connection_id)
            .map(|(_, subscription)| subscription.org_id);

        if let Some(org_id) = removed.as_deref() {
            info!(
                "event=hub_connection_dropped module=hub status=ok connection_id={connection_id} org_id={org_id}"
            );
        }
        removed
    }

    /// Organization the connection is currently subscribed to, if any.
    pub fn subscription_of(&self, connection_id: &str) -> Option<String> {
        self.members
            .get(connection_id)
            .map(|subscription| subscription.org_id.clone())
    }

    /// Snapshot of the organization's current members.
    ///
    /// Cloned senders are returned so actual delivery runs without holding
    /// any shard guard.
    pub fn subscribers_of(&self, org_id: &str) -> Vec<(String, mpsc::Sender<ChangeEvent>)> {
        self.members
            .iter()
            .filter(|member| member.value().org_id == org_id)
            .map(|member| (member.key().clone(), member.value().sender.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
