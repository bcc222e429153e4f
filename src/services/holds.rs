//! Hold manager: temporary reservations made during checkout.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Hold;
use crate::services::inventory;
use crate::utils::error::AppError;
use crate::utils::ttl::deadline_after;

/// Create a hold for `(user, tier)`, or renew the existing one. A renewal
/// first returns the old quantity to the ledger and then reserves the new
/// one, so changing the cart quantity never double-counts. The whole
/// operation runs under the tier row lock.
pub async fn create_or_renew(
    pool: &PgPool,
    user_id: Uuid,
    tier_id: Uuid,
    quantity: i32,
    ttl: std::time::Duration,
) -> Result<Hold, AppError> {
    if quantity <= 0 {
        return Err(AppError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }
    let expires_at = deadline_after(Utc::now(), ttl)?;

    let mut tx = pool.begin().await?;

    let tier = inventory::lock_tier(&mut tx, tier_id).await?;
    if !tier.is_active {
        return Err(AppError::ValidationError(
            "This ticket tier is no longer on sale".to_string(),
        ));
    }

    let existing = sqlx::query_as::<_, Hold>(
        r"
        SELECT id, user_id, tier_id, quantity, created_at, expires_at, released
        FROM holds
        WHERE user_id = $1 AND tier_id = $2 AND NOT released
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .bind(tier_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(ref old) = existing {
        inventory::release(&mut tx, tier_id, old.quantity).await?;
    }
    inventory::reserve(&mut tx, &tier, quantity).await?;

    let hold = match existing {
        Some(old) => {
            sqlx::query_as::<_, Hold>(
                r"
                UPDATE holds
                SET quantity = $2, expires_at = $3
                WHERE id = $1
                RETURNING id, user_id, tier_id, quantity, created_at, expires_at, released
                ",
            )
            .bind(old.id)
            .bind(quantity)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, Hold>(
                r"
                INSERT INTO holds (user_id, tier_id, quantity, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, tier_id, quantity, created_at, expires_at, released
                ",
            )
            .bind(user_id)
            .bind(tier_id)
            .bind(quantity)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;

    tracing::debug!(
        hold_id = %hold.id,
        tier_id = %tier_id,
        quantity,
        expires_at = %hold.expires_at,
        "hold created or renewed"
    );
    Ok(hold)
}

/// Explicit release, e.g. the user emptied their cart. Idempotent: releasing
/// a hold that is already gone succeeds without touching the ledger.
pub async fn release(pool: &PgPool, hold_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let hold = sqlx::query_as::<_, Hold>(
        r"
        SELECT id, user_id, tier_id, quantity, created_at, expires_at, released
        FROM holds
        WHERE id = $1
        ",
    )
    .bind(hold_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Hold {hold_id} was not found")))?;

    if hold.user_id != user_id {
        return Err(AppError::Forbidden(
            "This hold belongs to another user".to_string(),
        ));
    }

    // Lock the tier before the guarded flip, same order as create_or_renew.
    inventory::lock_tier(&mut tx, hold.tier_id).await?;

    let claimed = sqlx::query(
        r"
        UPDATE holds SET released = TRUE
        WHERE id = $1 AND NOT released
        ",
    )
    .bind(hold_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 1 {
        inventory::release(&mut tx, hold.tier_id, hold.quantity).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Expiry sweep. One statement claims the lapsed holds (setting `released`
/// in the same statement that selects them, so concurrent sweepers cannot
/// double-release) and returns their quantities to the tier counters.
pub async fn release_expired(pool: &PgPool) -> Result<u64, AppError> {
    let reclaimed: i64 = sqlx::query_scalar(
        r"
        WITH claimed AS (
            UPDATE holds
            SET released = TRUE
            WHERE NOT released AND expires_at < now()
            RETURNING tier_id, quantity
        ),
        applied AS (
            UPDATE ticket_tiers t
            SET held_count = t.held_count - c.total, updated_at = now()
            FROM (
                SELECT tier_id, SUM(quantity)::int AS total
                FROM claimed
                GROUP BY tier_id
            ) c
            WHERE t.id = c.tier_id
            RETURNING t.id
        )
        SELECT count(*) FROM claimed
        ",
    )
    .fetch_one(pool)
    .await?;

    if reclaimed > 0 {
        tracing::info!(count = reclaimed, "expired holds reclaimed");
    }
    Ok(reclaimed as u64)
}
