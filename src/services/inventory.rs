//! Inventory ledger: the tier counters and their atomic adjustments.
//!
//! Overselling is the one irreversible failure mode, so every adjustment
//! runs with the tier row locked and re-reads the free capacity immediately
//! before mutating. Callers open the transaction; the ledger operations
//! compose inside it.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::TicketTier;
use crate::utils::error::AppError;

/// Load the tier row with `FOR UPDATE`, serializing every writer on this
/// tier for the rest of the transaction.
pub async fn lock_tier(conn: &mut PgConnection, tier_id: Uuid) -> Result<TicketTier, AppError> {
    sqlx::query_as::<_, TicketTier>(
        r"
        SELECT id, event_id, name, description, price, capacity,
               held_count, issued_count, is_active, created_at, updated_at
        FROM ticket_tiers
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(tier_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Ticket tier {tier_id} was not found")))
}

/// Move `quantity` units into `held_count`. The caller must already hold the
/// tier row lock (see [`lock_tier`]); the free-capacity check happens on the
/// locked row, so concurrent reservations cannot both succeed past capacity.
pub async fn reserve(
    conn: &mut PgConnection,
    tier: &TicketTier,
    quantity: i32,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r"
        UPDATE ticket_tiers
        SET held_count = held_count + $2, updated_at = now()
        WHERE id = $1
          AND capacity - held_count - issued_count >= $2
        ",
    )
    .bind(tier.id)
    .bind(quantity)
    .execute(conn)
    .await?
    .rows_affected();

    if updated == 0 {
        // Fail fast; whether to offer a waitlist is the caller's call.
        return Err(AppError::InsufficientInventory {
            tier_id: tier.id,
            requested: quantity,
            remaining: tier.remaining(),
        });
    }
    Ok(())
}

/// Return `quantity` held units to the free pool.
pub async fn release(
    conn: &mut PgConnection,
    tier_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r"
        UPDATE ticket_tiers
        SET held_count = held_count - $2, updated_at = now()
        WHERE id = $1 AND held_count >= $2
        ",
    )
    .bind(tier_id)
    .bind(quantity)
    .execute(conn)
    .await?
    .rows_affected();

    if updated == 0 {
        // A release that exceeds held_count means the ledger drifted; abort
        // the surrounding transaction rather than papering over it.
        return Err(AppError::InternalServerError(format!(
            "ledger drift: cannot release {quantity} from tier {tier_id}"
        )));
    }
    Ok(())
}

/// Convert `quantity` held units into issued ones. Called at issuance, after
/// the hold row has been claimed.
pub async fn commit(
    conn: &mut PgConnection,
    tier_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r"
        UPDATE ticket_tiers
        SET held_count = held_count - $2,
            issued_count = issued_count + $2,
            updated_at = now()
        WHERE id = $1 AND held_count >= $2
        ",
    )
    .bind(tier_id)
    .bind(quantity)
    .execute(conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::InternalServerError(format!(
            "ledger drift: cannot commit {quantity} from tier {tier_id}"
        )));
    }
    Ok(())
}
