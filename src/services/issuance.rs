//! Issuance: converting a paid order plus its hold into durable, signed,
//! redeemable tickets.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::events::{DomainEvent, EventSink};
use crate::models::{Hold, Order, OrderStatus, TicketWallet, WalletStatus};
use crate::services::{inventory, promo};
use crate::token::{self, QrPayload, TokenSigner};
use crate::utils::error::AppError;

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, promo_code_id, status, total, created_at, paid_at
        FROM orders
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} was not found")))
}

/// Flip the order to paid and consume its promo code, in one transaction.
/// Idempotent for billing-webhook retries: confirming an already-paid order
/// returns it unchanged and does not touch the code again.
pub async fn confirm_payment(pool: &PgPool, order_id: Uuid) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;

    let order = lock_order(&mut tx, order_id).await?;
    match order.status {
        OrderStatus::Paid => return Ok(order),
        OrderStatus::Cancelled => {
            return Err(AppError::StateConflict(format!(
                "Order {order_id} was cancelled"
            )));
        }
        OrderStatus::Pending => {}
    }

    if let Some(promo_id) = order.promo_code_id {
        promo::redeem_on_payment(&mut tx, promo_id).await?;
    }

    let order = sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET status = 'paid', paid_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, user_id, promo_code_id, status, total, created_at, paid_at
        ",
    )
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(order_id = %order_id, "order confirmed paid");
    Ok(order)
}

/// Issue tickets for a paid order. Atomically: commit the hold's quantity in
/// the ledger, claim the hold, and insert one active wallet row per unit
/// with a freshly signed QR token.
///
/// An expired hold is a hard failure. The inventory may already have been
/// reassigned, so the caller must restart checkout rather than retry.
pub async fn issue(
    pool: &PgPool,
    signer: &dyn TokenSigner,
    events: &dyn EventSink,
    order_id: Uuid,
    hold_id: Uuid,
    quantity: i32,
) -> Result<Vec<TicketWallet>, AppError> {
    let mut tx = pool.begin().await?;

    let order = lock_order(&mut tx, order_id).await?;
    if order.status != OrderStatus::Paid {
        return Err(AppError::StateConflict(format!(
            "Order {order_id} is not paid"
        )));
    }

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

    if hold.user_id != order.user_id {
        return Err(AppError::Forbidden(
            "This hold belongs to another user".to_string(),
        ));
    }
    if hold.quantity != quantity {
        return Err(AppError::ValidationError(format!(
            "Hold covers {} units, not {quantity}",
            hold.quantity
        )));
    }

    let now = Utc::now();
    if hold.released {
        return Err(AppError::StateConflict(format!(
            "Hold {hold_id} was already released or converted"
        )));
    }
    if hold.is_expired(now) {
        return Err(AppError::HoldExpired(hold_id));
    }

    // Tier lock first, then the guarded hold claim; the claim is what makes
    // a concurrent double-issue lose.
    let tier = inventory::lock_tier(&mut tx, hold.tier_id).await?;
    let claimed = sqlx::query(
        r"
        UPDATE holds SET released = TRUE
        WHERE id = $1 AND NOT released AND expires_at >= $2
        ",
    )
    .bind(hold_id)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if claimed == 0 {
        return Err(AppError::StateConflict(format!(
            "Hold {hold_id} was already released or converted"
        )));
    }

    inventory::commit(&mut tx, tier.id, quantity).await?;

    let ticket_id = product_ticket_for_tier(&mut tx, tier.id).await?;

    let mut wallets = Vec::with_capacity(quantity as usize);
    for _ in 0..quantity {
        let wallet_id = Uuid::new_v4();
        let payload = QrPayload {
            ticket_wallet_id: wallet_id,
            event_id: tier.event_id,
            owner_user_id: order.user_id,
            issued_at: now,
        };
        let qr_token = token::encode(signer, &payload);

        let wallet = sqlx::query_as::<_, TicketWallet>(
            r"
            INSERT INTO ticket_wallets (id, ticket_id, owner_user_id, order_id, status, qr_token, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, ticket_id, owner_user_id, order_id, status, qr_token, issued_at, used_at
            ",
        )
        .bind(wallet_id)
        .bind(ticket_id)
        .bind(order.user_id)
        .bind(order.id)
        .bind(WalletStatus::Active)
        .bind(&qr_token)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        wallets.push(wallet);
    }

    tx.commit().await?;

    events.publish(DomainEvent::TicketIssued {
        order_id: order.id,
        owner_user_id: order.user_id,
        wallet_ids: wallets.iter().map(|w| w.id).collect(),
    });
    tracing::info!(
        order_id = %order.id,
        tier_id = %tier.id,
        quantity,
        "tickets issued"
    );
    Ok(wallets)
}

/// The tier-level product definition row, created lazily on first issuance.
/// Safe without an upsert: the caller holds the tier row lock.
async fn product_ticket_for_tier(
    conn: &mut PgConnection,
    tier_id: Uuid,
) -> Result<Uuid, AppError> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM tickets WHERE tier_id = $1")
            .bind(tier_id)
            .fetch_optional(&mut *conn)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO tickets (tier_id) VALUES ($1) RETURNING id")
            .bind(tier_id)
            .fetch_one(conn)
            .await?;
    Ok(id)
}
