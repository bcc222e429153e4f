use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A time-boxed claim on tier inventory made at checkout start. Holds are
/// never durable: they end by explicit release, expiry sweep, or conversion
/// into issued tickets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Hold {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub released: bool,
}

impl Hold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Live means the hold still counts against the tier: not released and
    /// not past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.released && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hold(released: bool, expires_in: Duration) -> Hold {
        let now = Utc::now();
        Hold {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tier_id: Uuid::new_v4(),
            quantity: 2,
            created_at: now,
            expires_at: now + expires_in,
            released,
        }
    }

    #[test]
    fn unreleased_unexpired_hold_is_live() {
        assert!(hold(false, Duration::minutes(10)).is_live(Utc::now()));
    }

    #[test]
    fn expired_or_released_hold_is_not_live() {
        assert!(!hold(false, Duration::minutes(-1)).is_live(Utc::now()));
        assert!(!hold(true, Duration::minutes(10)).is_live(Utc::now()));
    }
}
