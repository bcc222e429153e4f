//! Wallet-facing transfer handlers.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::transfers;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct ProposeTransferRequest {
    pub ticket_wallet_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

/// `POST /transfers`: current owner offers the ticket to another user.
pub async fn propose_transfer(
    State(state): State<AppState>,
    Json(request): Json<ProposeTransferRequest>,
) -> Result<Response, AppError> {
    let transfer = transfers::propose(
        &state.pool,
        request.ticket_wallet_id,
        request.from_user_id,
        request.to_user_id,
        state.config.transfer_ttl,
    )
    .await?;
    Ok(created(transfer, "Transfer proposed"))
}

#[derive(Deserialize)]
pub struct TransferActionRequest {
    pub user_id: Uuid,
}

/// `POST /transfers/:id/accept`: recipient takes ownership.
pub async fn accept_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
    Json(request): Json<TransferActionRequest>,
) -> Result<Response, AppError> {
    let transfer = transfers::accept(
        &state.pool,
        state.events.as_ref(),
        transfer_id,
        request.user_id,
    )
    .await?;
    Ok(success(transfer, "Transfer accepted"))
}

/// `POST /transfers/:id/decline`: recipient refuses the offer.
pub async fn decline_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
    Json(request): Json<TransferActionRequest>,
) -> Result<Response, AppError> {
    let transfer = transfers::decline(&state.pool, transfer_id, request.user_id).await?;
    Ok(success(transfer, "Transfer declined"))
}

/// `POST /transfers/:id/cancel`: proposer withdraws the offer.
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
    Json(request): Json<TransferActionRequest>,
) -> Result<Response, AppError> {
    let transfer = transfers::cancel(&state.pool, transfer_id, request.user_id).await?;
    Ok(success(transfer, "Transfer cancelled"))
}
