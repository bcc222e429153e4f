//! Checkout-facing handlers: holds and promo validation.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::{holds, promo};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Deserialize)]
pub struct CreateHoldRequest {
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub quantity: i32,
}

/// `POST /checkout/holds`: reserve inventory for the duration of checkout.
/// Calling again for the same `(user, tier)` renews the hold in place.
pub async fn create_hold(
    State(state): State<AppState>,
    Json(request): Json<CreateHoldRequest>,
) -> Result<Response, AppError> {
    let hold = holds::create_or_renew(
        &state.pool,
        request.user_id,
        request.tier_id,
        request.quantity,
        state.config.hold_ttl,
    )
    .await?;
    Ok(created(hold, "Hold created"))
}

#[derive(Deserialize)]
pub struct ReleaseHoldParams {
    pub user_id: Uuid,
}

/// `DELETE /checkout/holds/:hold_id`: give the inventory back early.
pub async fn release_hold(
    State(state): State<AppState>,
    Path(hold_id): Path<Uuid>,
    Query(params): Query<ReleaseHoldParams>,
) -> Result<Response, AppError> {
    holds::release(&state.pool, hold_id, params.user_id).await?;
    Ok(empty_success("Hold released"))
}

#[derive(Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub event_id: Uuid,
}

/// `POST /promo/validate`: read-only; the response always carries either
/// the discount or the specific rejection reason.
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(request): Json<ValidatePromoRequest>,
) -> Result<Response, AppError> {
    let evaluation = promo::validate(&state.pool, &request.code, request.event_id).await?;
    Ok(success(evaluation, "Promo code evaluated"))
}
