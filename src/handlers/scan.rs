//! Device-facing scan handler.

use axum::extract::State;
use axum::response::Response;
use axum::Json;

use crate::services::redemption::{self, ScanRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// `POST /scan`: validate a QR token at the door. Rejections (already used,
/// invalid, unauthorized) are ordinary outcomes and come back as 200 with
/// the result in the body; the device shows `message` either way.
pub async fn scan_ticket(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Response, AppError> {
    let outcome = redemption::scan(
        &state.pool,
        state.signer.as_ref(),
        state.events.as_ref(),
        request,
    )
    .await?;
    let message = outcome.message.clone();
    Ok(success(outcome, message))
}
