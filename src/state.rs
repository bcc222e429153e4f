use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::events::EventSink;
use crate::token::TokenSigner;

/// Shared handles for request handlers. The engine keeps no mutable state
/// here; everything mutable lives in the database.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub signer: Arc<dyn TokenSigner>,
    pub events: Arc<dyn EventSink>,
    pub config: Config,
}
