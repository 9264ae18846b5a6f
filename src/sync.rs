// src/sync.rs
use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::models::Snapshot;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out point for collection snapshots: one broadcast channel per user.
///
/// Every successful mutation publishes the full updated collection; there is
/// no ordering guarantee between different collections' snapshots, and a
/// subscriber that lags simply picks up a fresher full replacement.
pub struct SnapshotHub {
    channels: Mutex<HashMap<String, broadcast::Sender<Snapshot>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Open a live subscription for one user's collections. Dropping the
    /// receiver is the unsubscribe.
    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Snapshot> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Broadcast a full-collection snapshot to this user's subscribers.
    /// A user with no active subscribers is a no-op.
    pub fn publish(&self, user_id: &str, snapshot: Snapshot) {
        let channels = self.channels.lock().unwrap();
        if let Some(tx) = channels.get(user_id) {
            let _ = tx.send(snapshot);
        }
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Member;

    fn members_snapshot(name: &str) -> Snapshot {
        Snapshot::Members(vec![Member {
            id: "m1".to_string(),
            name: name.to_string(),
        }])
    }

    #[tokio::test]
    async fn subscriber_receives_published_snapshot() {
        let hub = SnapshotHub::new();
        let mut rx = hub.subscribe("alice");
        hub.publish("alice", members_snapshot("amy"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got, members_snapshot("amy"));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let hub = SnapshotHub::new();
        let mut alice = hub.subscribe("alice");
        let mut bob = hub.subscribe("bob");
        hub.publish("alice", members_snapshot("amy"));
        assert!(alice.recv().await.is_ok());
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = SnapshotHub::new();
        hub.publish("nobody", members_snapshot("amy"));
    }

    #[tokio::test]
    async fn all_subscribers_of_a_user_receive() {
        let hub = SnapshotHub::new();
        let mut first = hub.subscribe("alice");
        let mut second = hub.subscribe("alice");
        hub.publish("alice", members_snapshot("amy"));
        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }
}
