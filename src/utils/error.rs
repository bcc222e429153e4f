use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::utils::response::error as error_response;

/// Engine error taxonomy. Expected, frequent outcomes (an already-used scan,
/// an invalid promo code) are NOT errors; they travel through the normal
/// result types. Everything here short-circuits the request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Capacity error: the tier cannot cover the requested quantity. Never
    /// retried automatically; the caller picks a smaller quantity or offers
    /// a waitlist.
    #[error("not enough inventory in tier {tier_id}: requested {requested}, remaining {remaining}")]
    InsufficientInventory {
        tier_id: Uuid,
        requested: i32,
        remaining: i32,
    },

    /// The hold lapsed before issuance. Checkout must restart: the inventory
    /// may already belong to someone else.
    #[error("hold {0} has expired")]
    HoldExpired(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The entity is no longer in a state that permits the operation, e.g.
    /// transferring a used ticket or accepting a resolved transfer.
    #[error("Conflict: {0}")]
    StateConflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InsufficientInventory { .. } => StatusCode::CONFLICT,
            AppError::HoldExpired(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StateConflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AppError::HoldExpired(_) => "HOLD_EXPIRED",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StateConflict(_) => "STATE_CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Internal error");
            }
            other => {
                // Domain rejections are request-level events, not faults.
                tracing::debug!(error = ?other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Checkout and door UIs need actionable messages, so domain errors
        // pass through verbatim. Database internals never do.
        let public_message = match &self {
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
