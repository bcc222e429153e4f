//! Periodic reclamation of expired holds and transfers.
//!
//! Expiry is lazy everywhere else (discovered on the next read); this task
//! bounds how stale the counters can get. A failed tick only delays
//! reclamation, so failures are logged and retried on the next tick, never
//! escalated.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::events::EventSink;
use crate::services::{holds, transfers};

pub fn spawn(pool: PgPool, events: Arc<dyn EventSink>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(&pool, events.as_ref()).await;
        }
    })
}

/// One sweep pass. Both halves are idempotent and safe to run from several
/// instances concurrently.
pub async fn run_once(pool: &PgPool, events: &dyn EventSink) {
    match holds::release_expired(pool).await {
        Ok(count) if count > 0 => {
            tracing::debug!(count, "sweep: holds reclaimed");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "sweep: hold reclamation failed, will retry next tick");
        }
    }

    match transfers::sweep_expired(pool, events).await {
        Ok(count) if count > 0 => {
            tracing::debug!(count, "sweep: transfers expired");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "sweep: transfer expiry failed, will retry next tick");
        }
    }
}
