//! Billing-collaborator handler: post-payment issuance.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::issuance;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::created;

#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    pub order_id: Uuid,
    pub hold_id: Uuid,
    pub quantity: i32,
}

/// `POST /payments/confirm`: called once the billing service has captured
/// payment. Marks the order paid (consuming any promo code) and issues the
/// tickets. If the hold expired in the meantime the issuance step fails hard
/// and checkout must restart.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Response, AppError> {
    let order = issuance::confirm_payment(&state.pool, request.order_id).await?;
    let wallets = issuance::issue(
        &state.pool,
        state.signer.as_ref(),
        state.events.as_ref(),
        order.id,
        request.hold_id,
        request.quantity,
    )
    .await?;
    Ok(created(wallets, "Tickets issued"))
}
