//! Transfer workflow: proposed, time-boxed ownership reassignment.
//!
//! Ownership moves only at acceptance. A pending transfer that lapses needs
//! no compensating action, because nothing changed when it was proposed.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::events::{DomainEvent, EventSink};
use crate::models::{TicketTransfer, TicketWallet, TransferStatus};
use crate::utils::error::AppError;
use crate::utils::ttl::deadline_after;

const TRANSFER_COLUMNS: &str =
    "id, ticket_wallet_id, from_user_id, to_user_id, status, created_at, expires_at, resolved_at";

/// Propose handing a ticket to another user. Only the current owner of an
/// active (never used, refunded or cancelled) wallet may propose, and only
/// one proposal can be open per wallet.
pub async fn propose(
    pool: &PgPool,
    ticket_wallet_id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    ttl: std::time::Duration,
) -> Result<TicketTransfer, AppError> {
    if from_user_id == to_user_id {
        return Err(AppError::ValidationError(
            "Cannot transfer a ticket to yourself".to_string(),
        ));
    }
    let expires_at = deadline_after(Utc::now(), ttl)?;

    let mut tx = pool.begin().await?;

    let wallet = sqlx::query_as::<_, TicketWallet>(
        r"
        SELECT id, ticket_id, owner_user_id, order_id, status, qr_token, issued_at, used_at
        FROM ticket_wallets
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(ticket_wallet_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_wallet_id} was not found")))?;

    if wallet.owner_user_id != from_user_id {
        return Err(AppError::Forbidden(
            "Only the ticket owner can propose a transfer".to_string(),
        ));
    }
    // Hard rejection, not retryable: redemption and transfer are mutually
    // exclusive once a scan lands.
    if !wallet.status.is_redeemable() {
        return Err(AppError::StateConflict(format!(
            "Ticket is {} and cannot be transferred",
            wallet.status.as_str()
        )));
    }

    let recipient_exists: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(to_user_id)
            .fetch_one(&mut *tx)
            .await?;
    if !recipient_exists.0 {
        return Err(AppError::ValidationError(
            "Recipient does not exist".to_string(),
        ));
    }

    let transfer = sqlx::query_as::<_, TicketTransfer>(&format!(
        r"
        INSERT INTO ticket_transfers (ticket_wallet_id, from_user_id, to_user_id, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING {TRANSFER_COLUMNS}
        ",
    ))
    .bind(ticket_wallet_id)
    .bind(from_user_id)
    .bind(to_user_id)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db) = &e {
            if db.constraint() == Some("ticket_transfers_pending_idx") {
                return AppError::StateConflict(
                    "A pending transfer already exists for this ticket".to_string(),
                );
            }
        }
        AppError::DatabaseError(e)
    })?;

    tx.commit().await?;

    tracing::info!(
        transfer_id = %transfer.id,
        wallet_id = %ticket_wallet_id,
        "transfer proposed"
    );
    Ok(transfer)
}

/// Accept a pending transfer: the wallet's owner changes, its redemption
/// status does not.
pub async fn accept(
    pool: &PgPool,
    events: &dyn EventSink,
    transfer_id: Uuid,
    to_user_id: Uuid,
) -> Result<TicketTransfer, AppError> {
    let mut tx = pool.begin().await?;

    let transfer = sqlx::query_as::<_, TicketTransfer>(&format!(
        r"
        SELECT {TRANSFER_COLUMNS}
        FROM ticket_transfers
        WHERE id = $1
        FOR UPDATE
        ",
    ))
    .bind(transfer_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Transfer {transfer_id} was not found")))?;

    if transfer.to_user_id != to_user_id {
        return Err(AppError::Forbidden(
            "This transfer is addressed to another user".to_string(),
        ));
    }
    if transfer.status != TransferStatus::Pending {
        return Err(AppError::StateConflict(format!(
            "Transfer was already {}",
            status_word(transfer.status)
        )));
    }

    let now = Utc::now();
    if transfer.is_expired(now) {
        // Lazy expiry: the sweep may not have run yet, so settle it here.
        sqlx::query(
            r"
            UPDATE ticket_transfers SET status = 'expired', resolved_at = now()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(transfer_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        return Err(AppError::StateConflict("Transfer has expired".to_string()));
    }

    // Reassign ownership, guarded on the wallet still being active. If the
    // ticket was scanned or refunded since the proposal, the acceptance
    // loses and the transfer stays pending until it expires.
    let reassigned = sqlx::query(
        r"
        UPDATE ticket_wallets
        SET owner_user_id = $2
        WHERE id = $1 AND status = 'active'
        ",
    )
    .bind(transfer.ticket_wallet_id)
    .bind(to_user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if reassigned == 0 {
        return Err(AppError::StateConflict(
            "Ticket is no longer transferable".to_string(),
        ));
    }

    let transfer = sqlx::query_as::<_, TicketTransfer>(&format!(
        r"
        UPDATE ticket_transfers
        SET status = 'accepted', resolved_at = now()
        WHERE id = $1
        RETURNING {TRANSFER_COLUMNS}
        ",
    ))
    .bind(transfer_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    events.publish(DomainEvent::TransferAccepted {
        transfer_id: transfer.id,
        ticket_wallet_id: transfer.ticket_wallet_id,
        from_user_id: transfer.from_user_id,
        to_user_id: transfer.to_user_id,
    });
    tracing::info!(transfer_id = %transfer.id, "transfer accepted");
    Ok(transfer)
}

/// Decline, by the recipient. Terminal; no ownership change to undo.
pub async fn decline(
    pool: &PgPool,
    transfer_id: Uuid,
    to_user_id: Uuid,
) -> Result<TicketTransfer, AppError> {
    resolve(pool, transfer_id, to_user_id, Party::Recipient, TransferStatus::Declined).await
}

/// Cancel, by the proposer. Terminal; no ownership change to undo.
pub async fn cancel(
    pool: &PgPool,
    transfer_id: Uuid,
    from_user_id: Uuid,
) -> Result<TicketTransfer, AppError> {
    resolve(pool, transfer_id, from_user_id, Party::Proposer, TransferStatus::Cancelled).await
}

enum Party {
    Proposer,
    Recipient,
}

async fn resolve(
    pool: &PgPool,
    transfer_id: Uuid,
    user_id: Uuid,
    party: Party,
    target: TransferStatus,
) -> Result<TicketTransfer, AppError> {
    let user_column = match party {
        Party::Proposer => "from_user_id",
        Party::Recipient => "to_user_id",
    };

    // Single guarded update: at most one concurrent resolver wins.
    let resolved = sqlx::query_as::<_, TicketTransfer>(&format!(
        r"
        UPDATE ticket_transfers
        SET status = $2, resolved_at = now()
        WHERE id = $1 AND status = 'pending' AND {user_column} = $3
        RETURNING {TRANSFER_COLUMNS}
        ",
    ))
    .bind(transfer_id)
    .bind(target)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(transfer) = resolved {
        return Ok(transfer);
    }

    // Lost or never eligible; read the row once to say why.
    let current = sqlx::query_as::<_, TicketTransfer>(&format!(
        "SELECT {TRANSFER_COLUMNS} FROM ticket_transfers WHERE id = $1",
    ))
    .bind(transfer_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Transfer {transfer_id} was not found")))?;

    let involved = match party {
        Party::Proposer => current.from_user_id,
        Party::Recipient => current.to_user_id,
    };
    if involved != user_id {
        return Err(AppError::Forbidden(
            "You are not a party to this transfer".to_string(),
        ));
    }
    Err(AppError::StateConflict(format!(
        "Transfer was already {}",
        status_word(current.status)
    )))
}

/// Flip every lapsed pending transfer to expired. Safe to run from several
/// instances at once: the status guard makes each flip happen exactly once.
pub async fn sweep_expired(pool: &PgPool, events: &dyn EventSink) -> Result<u64, AppError> {
    let expired: Vec<(Uuid, Uuid)> = sqlx::query_as(
        r"
        UPDATE ticket_transfers
        SET status = 'expired', resolved_at = now()
        WHERE status = 'pending' AND expires_at < now()
        RETURNING id, ticket_wallet_id
        ",
    )
    .fetch_all(pool)
    .await?;

    for (transfer_id, ticket_wallet_id) in &expired {
        events.publish(DomainEvent::TransferExpired {
            transfer_id: *transfer_id,
            ticket_wallet_id: *ticket_wallet_id,
        });
    }
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "pending transfers expired");
    }
    Ok(expired.len() as u64)
}

fn status_word(status: TransferStatus) -> &'static str {
    match status {
        TransferStatus::Pending => "pending",
        TransferStatus::Accepted => "accepted",
        TransferStatus::Declined => "declined",
        TransferStatus::Expired => "expired",
        TransferStatus::Cancelled => "cancelled",
    }
}
