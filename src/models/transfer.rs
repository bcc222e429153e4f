use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Cancelled,
}

impl TransferStatus {
    /// `pending` is the only non-terminal state.
    pub fn can_become(self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Accepted)
                | (TransferStatus::Pending, TransferStatus::Declined)
                | (TransferStatus::Pending, TransferStatus::Expired)
                | (TransferStatus::Pending, TransferStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

/// A proposed ownership reassignment between two users. Ownership moves only
/// on acceptance, so an expired or declined transfer needs no compensation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketTransfer {
    pub id: Uuid,
    pub ticket_wallet_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TicketTransfer {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
