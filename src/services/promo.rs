//! Promo code validation and consumption.
//!
//! Validation is read-only so that double-checkout attempts never burn codes
//! that never convert; the single guarded increment happens when an order
//! carrying the code transitions to paid.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{PromoCode, PromoEvaluation, PromoRejection};
use crate::utils::error::AppError;

async fn load_by_code(pool: &PgPool, code: &str) -> Result<Option<PromoCode>, AppError> {
    Ok(sqlx::query_as::<_, PromoCode>(
        r"
        SELECT id, code, event_id, discount_type, discount_value, max_uses,
               used_count, valid_from, valid_until, is_active, created_at
        FROM promo_codes
        WHERE code = $1
        ",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?)
}

/// Side-effect-free evaluation of a code for an event. Always returns an
/// evaluation; the UI needs the specific rejection reason, not an error.
pub async fn validate(
    pool: &PgPool,
    code: &str,
    event_id: Uuid,
) -> Result<PromoEvaluation, AppError> {
    let Some(promo) = load_by_code(pool, code).await? else {
        return Ok(PromoEvaluation::rejected(PromoRejection::NotFound));
    };

    Ok(match promo.evaluate(event_id, chrono::Utc::now()) {
        Ok(()) => PromoEvaluation::accepted(&promo),
        Err(rejection) => PromoEvaluation::rejected(rejection),
    })
}

/// Consume one use of the code, inside the order's paid transition. The
/// guard re-checks the bound, so a code validated by many in-flight orders
/// still never exceeds `max_uses`.
pub async fn redeem_on_payment(conn: &mut PgConnection, promo_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query(
        r"
        UPDATE promo_codes
        SET used_count = used_count + 1
        WHERE id = $1
          AND is_active
          AND (max_uses IS NULL OR used_count < max_uses)
        ",
    )
    .bind(promo_id)
    .execute(conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::ValidationError(
            PromoRejection::UsageLimitReached.reason().to_string(),
        ));
    }
    Ok(())
}
