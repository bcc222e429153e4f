use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{
    checkout, health_check, payments, scan,
    transfers as transfer_handlers,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        // Checkout UI collaborator
        .route("/checkout/holds", post(checkout::create_hold))
        .route("/checkout/holds/:hold_id", delete(checkout::release_hold))
        .route("/promo/validate", post(checkout::validate_promo))
        // Billing collaborator
        .route("/payments/confirm", post(payments::confirm_payment))
        // Device-facing scanner client
        .route("/scan", post(scan::scan_ticket))
        // Wallet UI collaborator
        .route("/transfers", post(transfer_handlers::propose_transfer))
        .route(
            "/transfers/:transfer_id/accept",
            post(transfer_handlers::accept_transfer),
        )
        .route(
            "/transfers/:transfer_id/decline",
            post(transfer_handlers::decline_transfer),
        )
        .route(
            "/transfers/:transfer_id/cancel",
            post(transfer_handlers::cancel_transfer),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state);

    apply_security_headers(router)
}
