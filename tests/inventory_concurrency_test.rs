//! Inventory ledger and hold manager properties: no oversell under
//! concurrency, renewal idempotence, expiry reclamation.

mod support;

use std::time::Duration;

use turnstile_server::services::{holds, issuance, sweeper};
use turnstile_server::utils::error::AppError;

const TTL: Duration = Duration::from_secs(600);

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn last_ticket_goes_to_exactly_one_of_two_concurrent_buyers() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 1).await;
    let alice = support::create_user(&pool).await;
    let bob = support::create_user(&pool).await;

    let (a, b) = tokio::join!(
        holds::create_or_renew(&pool, alice, tier, 1, TTL),
        holds::create_or_renew(&pool, bob, tier, 1, TTL),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one buyer gets the last ticket");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(AppError::InsufficientInventory { remaining: 0, .. })
    ));

    let (held, issued) = support::tier_counts(&pool, tier).await;
    assert_eq!((held, issued), (1, 0));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn counters_never_exceed_capacity_under_concurrent_reservations() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let capacity = 5;
    let tier = support::create_tier(&pool, event, capacity).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let pool = pool.clone();
        let user = support::create_user(&pool).await;
        tasks.push(tokio::spawn(async move {
            holds::create_or_renew(&pool, user, tier, 1, TTL).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("task should not panic").is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, capacity, "every unit sold exactly once");
    let (held, issued) = support::tier_counts(&pool, tier).await;
    assert!(held + issued <= capacity);
    assert_eq!(held, capacity);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn renewing_a_hold_never_stacks_quantity() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 10).await;
    let user = support::create_user(&pool).await;

    let first = holds::create_or_renew(&pool, user, tier, 2, TTL).await.unwrap();
    for _ in 0..3 {
        let renewed = holds::create_or_renew(&pool, user, tier, 2, TTL).await.unwrap();
        // Same row, renewed in place.
        assert_eq!(renewed.id, first.id);
    }

    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 2, "renewals must not double-count");

    // Shrinking the cart releases the difference.
    holds::create_or_renew(&pool, user, tier, 1, TTL).await.unwrap();
    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn explicit_release_returns_inventory_and_is_idempotent() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 10).await;
    let user = support::create_user(&pool).await;

    let hold = holds::create_or_renew(&pool, user, tier, 3, TTL).await.unwrap();
    holds::release(&pool, hold.id, user).await.unwrap();
    holds::release(&pool, hold.id, user).await.unwrap();

    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 0);

    let stranger = support::create_user(&pool).await;
    let hold = holds::create_or_renew(&pool, user, tier, 1, TTL).await.unwrap();
    assert!(matches!(
        holds::release(&pool, hold.id, stranger).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn expired_hold_is_reclaimed_and_unusable_for_issuance() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 10).await;
    let user = support::create_user(&pool).await;

    let hold = holds::create_or_renew(&pool, user, tier, 2, TTL).await.unwrap();
    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 2);

    support::expire_hold(&pool, hold.id).await;
    let reclaimed = holds::release_expired(&pool).await.unwrap();
    assert_eq!(reclaimed, 1);

    // Back to the pre-reservation value.
    let (held, issued) = support::tier_counts(&pool, tier).await;
    assert_eq!((held, issued), (0, 0));

    // Issuance against the swept hold is a hard failure.
    let order = support::create_order(&pool, user, None).await;
    issuance::confirm_payment(&pool, order).await.unwrap();
    let signer = support::signer();
    let events = support::sink();
    let result = issuance::issue(&pool, &signer, &events, order, hold.id, 2).await;
    assert!(matches!(result, Err(AppError::StateConflict(_))));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn unswept_expired_hold_still_fails_issuance() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 10).await;
    let user = support::create_user(&pool).await;

    let hold = holds::create_or_renew(&pool, user, tier, 1, TTL).await.unwrap();
    support::expire_hold(&pool, hold.id).await;

    // The sweep has not run; expiry is discovered at issuance time.
    let order = support::create_order(&pool, user, None).await;
    issuance::confirm_payment(&pool, order).await.unwrap();
    let signer = support::signer();
    let events = support::sink();
    let result = issuance::issue(&pool, &signer, &events, order, hold.id, 1).await;
    assert!(matches!(result, Err(AppError::HoldExpired(_))));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn concurrent_sweeps_release_each_hold_once() {
    let pool = support::test_pool().await;
    let organizer = support::create_user(&pool).await;
    let event = support::create_event(&pool, organizer).await;
    let tier = support::create_tier(&pool, event, 10).await;

    for _ in 0..4 {
        let user = support::create_user(&pool).await;
        let hold = holds::create_or_renew(&pool, user, tier, 1, TTL).await.unwrap();
        support::expire_hold(&pool, hold.id).await;
    }
    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 4);

    let (a, b, c) = tokio::join!(
        holds::release_expired(&pool),
        holds::release_expired(&pool),
        holds::release_expired(&pool),
    );
    let total = a.unwrap() + b.unwrap() + c.unwrap();
    assert_eq!(total, 4, "each hold reclaimed exactly once across sweepers");

    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 0);

    // One more pass finds nothing.
    let events = support::sink();
    sweeper::run_once(&pool, &events).await;
    let (held, _) = support::tier_counts(&pool, tier).await;
    assert_eq!(held, 0);
}
