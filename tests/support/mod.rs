//! Shared fixtures for the integration tests. These tests need a running
//! Postgres (DATABASE_URL); they are `#[ignore]`d so `cargo test` stays
//! green without one.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use turnstile_server::events::BroadcastSink;
use turnstile_server::models::DiscountType;
use turnstile_server::token::HmacSigner;

pub const TEST_SECRET: &str = "integration-test-secret";

pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

pub fn signer() -> HmacSigner {
    HmacSigner::new(TEST_SECRET)
}

pub fn sink() -> BroadcastSink {
    BroadcastSink::new(64)
}

pub async fn create_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind("Test User")
        .bind(format!("user-{id}@example.com"))
        .execute(pool)
        .await
        .expect("failed to insert user");
    id
}

pub async fn create_event(pool: &PgPool, organizer_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO events (id, organizer_id, title, starts_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(organizer_id)
    .bind("Test Event")
    .bind(Utc::now() + Duration::days(7))
    .execute(pool)
    .await
    .expect("failed to insert event");
    id
}

pub async fn create_tier(pool: &PgPool, event_id: Uuid, capacity: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r"
        INSERT INTO ticket_tiers (id, event_id, name, price, capacity)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(id)
    .bind(event_id)
    .bind("General Admission")
    .bind(Decimal::new(2500, 2))
    .bind(capacity)
    .execute(pool)
    .await
    .expect("failed to insert tier");
    id
}

pub async fn create_order(pool: &PgPool, user_id: Uuid, promo_code_id: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, user_id, promo_code_id, total) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(user_id)
    .bind(promo_code_id)
    .bind(Decimal::new(2500, 2))
    .execute(pool)
    .await
    .expect("failed to insert order");
    id
}

pub async fn create_promo(
    pool: &PgPool,
    code: &str,
    event_id: Option<Uuid>,
    max_uses: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r"
        INSERT INTO promo_codes
            (id, code, event_id, discount_type, discount_value, max_uses, valid_from, valid_until)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(id)
    .bind(code)
    .bind(event_id)
    .bind(DiscountType::Percentage)
    .bind(Decimal::new(10, 0))
    .bind(max_uses)
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(30))
    .execute(pool)
    .await
    .expect("failed to insert promo code");
    id
}

/// Full checkout for one unit: hold, order, payment confirmation, issuance.
pub async fn issue_one(
    pool: &PgPool,
    owner: Uuid,
    tier_id: Uuid,
) -> turnstile_server::models::TicketWallet {
    use turnstile_server::services::{holds, issuance};

    let hold = holds::create_or_renew(pool, owner, tier_id, 1, std::time::Duration::from_secs(600))
        .await
        .expect("hold should succeed");
    let order = create_order(pool, owner, None).await;
    issuance::confirm_payment(pool, order)
        .await
        .expect("payment confirmation should succeed");
    let signer = signer();
    let events = sink();
    issuance::issue(pool, &signer, &events, order, hold.id, 1)
        .await
        .expect("issuance should succeed")
        .into_iter()
        .next()
        .expect("one wallet should be issued")
}

/// Tier counters as `(held_count, issued_count)`.
pub async fn tier_counts(pool: &PgPool, tier_id: Uuid) -> (i32, i32) {
    sqlx::query_as("SELECT held_count, issued_count FROM ticket_tiers WHERE id = $1")
        .bind(tier_id)
        .fetch_one(pool)
        .await
        .expect("failed to read tier counters")
}

pub async fn scan_log_count(pool: &PgPool, wallet_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM scan_logs WHERE ticket_wallet_id = $1")
        .bind(wallet_id)
        .fetch_one(pool)
        .await
        .expect("failed to count scan logs")
}

/// Backdate a hold so the sweep sees it as lapsed.
pub async fn expire_hold(pool: &PgPool, hold_id: Uuid) {
    sqlx::query("UPDATE holds SET expires_at = now() - interval '1 minute' WHERE id = $1")
        .bind(hold_id)
        .execute(pool)
        .await
        .expect("failed to backdate hold");
}

/// Backdate a transfer so the sweep sees it as lapsed.
pub async fn expire_transfer(pool: &PgPool, transfer_id: Uuid) {
    sqlx::query(
        "UPDATE ticket_transfers SET expires_at = now() - interval '1 minute' WHERE id = $1",
    )
    .bind(transfer_id)
    .execute(pool)
    .await
    .expect("failed to backdate transfer");
}
