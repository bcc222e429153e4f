//! Outbound domain events.
//!
//! The engine emits these for collaborator services (notifications,
//! analytics) and never waits on a consumer. In-process consumers subscribe
//! to a broadcast channel; a slow subscriber only loses its own backlog.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TicketIssued {
        order_id: Uuid,
        owner_user_id: Uuid,
        wallet_ids: Vec<Uuid>,
    },
    TicketUsed {
        ticket_wallet_id: Uuid,
        owner_user_id: Uuid,
        scanned_at: DateTime<Utc>,
    },
    TransferAccepted {
        transfer_id: Uuid,
        ticket_wallet_id: Uuid,
        from_user_id: Uuid,
        to_user_id: Uuid,
    },
    TransferExpired {
        transfer_id: Uuid,
        ticket_wallet_id: Uuid,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TicketIssued { .. } => "ticket_issued",
            DomainEvent::TicketUsed { .. } => "ticket_used",
            DomainEvent::TransferAccepted { .. } => "transfer_accepted",
            DomainEvent::TransferExpired { .. } => "transfer_expired",
        }
    }
}

/// Where emitted events go. Swappable so tests can capture them and a
/// deployment can bridge to a real message bus.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Default sink: structured log line plus a best-effort broadcast.
pub struct BroadcastSink {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: DomainEvent) {
        tracing::info!(event = event.name(), payload = ?event, "domain event");
        // No subscribers is fine; the log line above is the floor.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        sink.publish(DomainEvent::TransferExpired {
            transfer_id: Uuid::new_v4(),
            ticket_wallet_id: Uuid::new_v4(),
        });
        let got = rx.recv().await.expect("event should arrive");
        assert_eq!(got.name(), "transfer_expired");
    }

    #[test]
    fn publish_without_subscribers_does_not_error() {
        let sink = BroadcastSink::new(8);
        sink.publish(DomainEvent::TicketUsed {
            ticket_wallet_id: Uuid::new_v4(),
            owner_user_id: Uuid::new_v4(),
            scanned_at: Utc::now(),
        });
    }
}
