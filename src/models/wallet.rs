use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tier-level product definition (access class). Static reference data; the
/// redeemable instance is [`TicketWallet`].
#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub tier_id: Uuid,
    pub access_level: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Used,
    Transferred,
    Refunded,
    Cancelled,
}

impl WalletStatus {
    /// Exhaustive transition table. Everything out of `Active` is allowed;
    /// every other state is terminal. Ownership reassignment on transfer
    /// acceptance is not a status change.
    pub fn can_become(self, next: WalletStatus) -> bool {
        match (self, next) {
            (WalletStatus::Active, WalletStatus::Used)
            | (WalletStatus::Active, WalletStatus::Transferred)
            | (WalletStatus::Active, WalletStatus::Refunded)
            | (WalletStatus::Active, WalletStatus::Cancelled) => true,
            _ => false,
        }
    }

    /// Whether a ticket in this state can still pass the door.
    pub fn is_redeemable(self) -> bool {
        matches!(self, WalletStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Used => "used",
            WalletStatus::Transferred => "transferred",
            WalletStatus::Refunded => "refunded",
            WalletStatus::Cancelled => "cancelled",
        }
    }
}

/// An individually owned, redeemable ticket instance. One row per purchased
/// unit. `used_at` is set exactly when `status` becomes `used`; both flip in
/// the same guarded update during a scan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketWallet {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub owner_user_id: Uuid,
    pub order_id: Uuid,
    pub status: WalletStatus,
    pub qr_token: String,
    pub issued_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_wallets_move() {
        use WalletStatus::*;
        for terminal in [Used, Transferred, Refunded, Cancelled] {
            for next in [Active, Used, Transferred, Refunded, Cancelled] {
                assert!(!terminal.can_become(next), "{terminal:?} -> {next:?}");
            }
        }
        assert!(Active.can_become(Used));
        assert!(Active.can_become(Transferred));
        assert!(Active.can_become(Refunded));
        assert!(Active.can_become(Cancelled));
        assert!(!Active.can_become(Active));
    }

    #[test]
    fn redeemable_means_active() {
        assert!(WalletStatus::Active.is_redeemable());
        assert!(!WalletStatus::Used.is_redeemable());
        assert!(!WalletStatus::Refunded.is_redeemable());
    }
}
