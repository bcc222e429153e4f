use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A priced admission class for an event. `capacity` is immutable once the
/// tier is on sale; `held_count` and `issued_count` move only through the
/// inventory ledger, under a row lock on this row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub capacity: i32,
    pub held_count: i32,
    pub issued_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketTier {
    /// Units neither held nor issued.
    pub fn remaining(&self) -> i32 {
        self.capacity - self.held_count - self.issued_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tier(capacity: i32, held: i32, issued: i32) -> TicketTier {
        TicketTier {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "General".to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            capacity,
            held_count: held,
            issued_count: issued,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn remaining_subtracts_both_counters() {
        assert_eq!(tier(100, 10, 30).remaining(), 60);
        assert_eq!(tier(5, 5, 0).remaining(), 0);
    }
}
