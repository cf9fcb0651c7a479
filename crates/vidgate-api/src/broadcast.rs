//! Per-record status broadcaster.
//!
//! Webhook handlers publish status transitions here; the SSE endpoint
//! subscribes per record id. Slow subscribers may lag and drop messages -
//! the stream re-snapshots from the store on subscribe, and pollers recover
//! via the snapshot endpoint, so lossiness is acceptable.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use vidgate_core::models::StatusMessage;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Default)]
pub struct StatusBroadcaster {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<StatusMessage>>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to status messages for one record.
    pub fn subscribe(&self, record_id: Uuid) -> broadcast::Receiver<StatusMessage> {
        let mut channels = self.channels.lock().expect("broadcaster lock poisoned");
        channels
            .entry(record_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a status message. Channels without subscribers are pruned so
    /// the registry does not grow with finished uploads.
    pub fn publish(&self, record_id: Uuid, message: StatusMessage) {
        let mut channels = self.channels.lock().expect("broadcaster lock poisoned");
        if let Some(sender) = channels.get(&record_id) {
            if sender.send(message).is_err() {
                channels.remove(&record_id);
            }
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.lock().expect("broadcaster lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgate_core::models::UploadStatus;

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let broadcaster = StatusBroadcaster::new();
        let id = Uuid::new_v4();
        let mut rx = broadcaster.subscribe(id);

        broadcaster.publish(id, StatusMessage::new(UploadStatus::Processing, None));

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.status, UploadStatus::Processing);
    }

    #[tokio::test]
    async fn publish_without_subscribers_prunes_channel() {
        let broadcaster = StatusBroadcaster::new();
        let id = Uuid::new_v4();
        {
            let _rx = broadcaster.subscribe(id);
        }
        assert_eq!(broadcaster.channel_count(), 1);

        broadcaster.publish(id, StatusMessage::new(UploadStatus::Completed, None));
        assert_eq!(broadcaster.channel_count(), 0);
    }

    #[tokio::test]
    async fn records_are_isolated() {
        let broadcaster = StatusBroadcaster::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = broadcaster.subscribe(a);
        let mut rx_b = broadcaster.subscribe(b);

        broadcaster.publish(a, StatusMessage::new(UploadStatus::Completed, None));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
