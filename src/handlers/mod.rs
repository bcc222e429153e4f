use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod checkout;
pub mod payments;
pub mod scan;
pub mod transfers;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "turnstile-api",
    };

    success(payload, "Health check successful")
}
