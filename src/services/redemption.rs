//! Redemption: validating a scanned QR token and performing the one
//! `active -> used` transition.
//!
//! Every gate short-circuits, and every call writes exactly one scan-log
//! row. The audit trail is required output: entry disputes are resolved
//! from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::events::{DomainEvent, EventSink};
use crate::models::{ScanResult, WalletStatus};
use crate::token::{self, TokenSigner};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub qr_token: String,
    pub scanner_user_id: Uuid,
    pub location: Option<String>,
    pub device_info: Option<String>,
}

/// What the door display shows after a successful scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanTicketSummary {
    pub ticket_wallet_id: Uuid,
    pub event_title: String,
    pub tier_name: String,
    pub holder_name: String,
    pub used_at: DateTime<Utc>,
}

/// Outcome of a scan. Failures are expected, frequent results, not errors;
/// the device renders `message` either way.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub result: ScanResult,
    pub message: String,
    pub ticket: Option<ScanTicketSummary>,
}

impl ScanOutcome {
    fn rejected(result: ScanResult) -> Self {
        Self {
            result,
            message: result.message().to_string(),
            ticket: None,
        }
    }
}

#[derive(Debug, FromRow)]
struct WalletScanRow {
    wallet_id: Uuid,
    owner_user_id: Uuid,
    holder_name: String,
    tier_name: String,
    event_id: Uuid,
    event_title: String,
}

/// Scan a ticket at the point of entry.
///
/// Gates, in order: token signature, wallet lookup, scanner authorization,
/// then the guarded `active -> used` flip. Two concurrent scans of the same
/// ticket race on that conditional update and exactly one affects a row.
pub async fn scan(
    pool: &PgPool,
    signer: &dyn TokenSigner,
    events: &dyn EventSink,
    request: ScanRequest,
) -> Result<ScanOutcome, AppError> {
    // Gate 1: signature. A bad token is logged and reported as plain
    // "invalid" with no detail about what failed.
    let payload = match token::decode(signer, &request.qr_token) {
        Ok(payload) => payload,
        Err(reason) => {
            tracing::debug!(error = %reason, "scan token rejected");
            log_scan(pool, None, &request, ScanResult::Invalid).await?;
            return Ok(ScanOutcome::rejected(ScanResult::Invalid));
        }
    };

    // Gate 2: the wallet must exist and belong to the event the token names.
    let Some(row) = load_wallet_for_scan(pool, payload.ticket_wallet_id).await? else {
        log_scan(pool, None, &request, ScanResult::Invalid).await?;
        return Ok(ScanOutcome::rejected(ScanResult::Invalid));
    };
    if row.event_id != payload.event_id {
        log_scan(pool, Some(row.wallet_id), &request, ScanResult::Invalid).await?;
        return Ok(ScanOutcome::rejected(ScanResult::Invalid));
    }

    // Gate 3: scanner authorization. Logged distinctly from invalid tokens
    // so organizers can audit misuse; the response reveals no ticket detail.
    if !scanner_is_authorized(pool, row.event_id, request.scanner_user_id).await? {
        log_scan(pool, Some(row.wallet_id), &request, ScanResult::Unauthorized).await?;
        return Ok(ScanOutcome::rejected(ScanResult::Unauthorized));
    }

    // Gate 4: the guarded transition. Zero rows affected means some other
    // outcome already happened; re-read and report the specific state.
    let flipped: Option<(DateTime<Utc>,)> = sqlx::query_as(
        r"
        UPDATE ticket_wallets
        SET status = 'used', used_at = now()
        WHERE id = $1 AND status = 'active'
        RETURNING used_at
        ",
    )
    .bind(row.wallet_id)
    .fetch_optional(pool)
    .await?;

    let Some((used_at,)) = flipped else {
        let outcome = already_settled_outcome(pool, row.wallet_id).await?;
        log_scan(pool, Some(row.wallet_id), &request, outcome.result).await?;
        return Ok(outcome);
    };

    log_scan(pool, Some(row.wallet_id), &request, ScanResult::Valid).await?;
    events.publish(DomainEvent::TicketUsed {
        ticket_wallet_id: row.wallet_id,
        owner_user_id: row.owner_user_id,
        scanned_at: used_at,
    });

    Ok(ScanOutcome {
        result: ScanResult::Valid,
        message: ScanResult::Valid.message().to_string(),
        ticket: Some(ScanTicketSummary {
            ticket_wallet_id: row.wallet_id,
            event_title: row.event_title,
            tier_name: row.tier_name,
            holder_name: row.holder_name,
            used_at,
        }),
    })
}

async fn load_wallet_for_scan(
    pool: &PgPool,
    wallet_id: Uuid,
) -> Result<Option<WalletScanRow>, AppError> {
    Ok(sqlx::query_as::<_, WalletScanRow>(
        r"
        SELECT w.id AS wallet_id,
               w.owner_user_id,
               u.name AS holder_name,
               tr.name AS tier_name,
               tr.event_id,
               e.title AS event_title
        FROM ticket_wallets w
        JOIN tickets t ON t.id = w.ticket_id
        JOIN ticket_tiers tr ON tr.id = t.tier_id
        JOIN events e ON e.id = tr.event_id
        JOIN users u ON u.id = w.owner_user_id
        WHERE w.id = $1
        ",
    )
    .bind(wallet_id)
    .fetch_optional(pool)
    .await?)
}

/// Event owner, organization member with scan rights, or per-event grant.
async fn scanner_is_authorized(
    pool: &PgPool,
    event_id: Uuid,
    scanner_user_id: Uuid,
) -> Result<bool, AppError> {
    let (authorized,): (bool,) = sqlx::query_as(
        r"
        SELECT EXISTS (
            SELECT 1
            FROM events e
            WHERE e.id = $1
              AND (
                  e.organizer_id = $2
                  OR EXISTS (
                      SELECT 1 FROM organization_members m
                      WHERE m.organization_id = e.organization_id
                        AND m.user_id = $2
                        AND m.can_scan
                  )
                  OR EXISTS (
                      SELECT 1 FROM event_scan_grants g
                      WHERE g.event_id = e.id AND g.user_id = $2
                  )
              )
        )
        ",
    )
    .bind(event_id)
    .bind(scanner_user_id)
    .fetch_one(pool)
    .await?;
    Ok(authorized)
}

/// The conditional update lost: report what actually happened to the ticket.
async fn already_settled_outcome(pool: &PgPool, wallet_id: Uuid) -> Result<ScanOutcome, AppError> {
    let current: Option<(WalletStatus, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT status, used_at FROM ticket_wallets WHERE id = $1")
            .bind(wallet_id)
            .fetch_optional(pool)
            .await?;

    Ok(match current {
        Some((WalletStatus::Used, used_at)) => {
            let mut outcome = ScanOutcome::rejected(ScanResult::AlreadyUsed);
            if let Some(at) = used_at {
                outcome.message = format!("Ticket already used at {}", at.format("%H:%M:%S"));
            }
            outcome
        }
        Some((WalletStatus::Active, _)) => {
            // The row flipped back? Not a reachable state; report invalid.
            ScanOutcome::rejected(ScanResult::Invalid)
        }
        Some((_, _)) => ScanOutcome::rejected(ScanResult::Expired),
        None => ScanOutcome::rejected(ScanResult::Invalid),
    })
}

/// Exactly one audit row per scan call, success or failure.
async fn log_scan(
    pool: &PgPool,
    wallet_id: Option<Uuid>,
    request: &ScanRequest,
    result: ScanResult,
) -> Result<(), AppError> {
    sqlx::query(
        r"
        INSERT INTO scan_logs (ticket_wallet_id, scanner_user_id, location, device_info, result)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(wallet_id)
    .bind(request.scanner_user_id)
    .bind(request.location.as_deref())
    .bind(request.device_info.as_deref())
    .bind(result)
    .execute(pool)
    .await?;
    Ok(())
}
