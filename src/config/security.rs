use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use std::env;
use tower_http::set_header::SetResponseHeaderLayer;

const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

/// Stack the standard security headers onto the router. HSTS is only added
/// in production, where TLS terminates in front of the service.
pub fn apply_security_headers(router: Router) -> Router {
    let router = router
        .layer(overriding(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(overriding(header::X_FRAME_OPTIONS, "DENY"))
        .layer(overriding(header::CONTENT_SECURITY_POLICY, CSP_API_VALUE))
        .layer(overriding(header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .layer(overriding(
            HeaderName::from_static("permissions-policy"),
            PERMISSIONS_POLICY_VALUE,
        ));

    if hsts_enabled() {
        router.layer(overriding(header::STRICT_TRANSPORT_SECURITY, HSTS_VALUE))
    } else {
        router
    }
}

fn overriding(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

fn hsts_enabled() -> bool {
    env::var("RUST_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_are_static_and_valid() {
        for value in [CSP_API_VALUE, HSTS_VALUE, PERMISSIONS_POLICY_VALUE] {
            assert!(HeaderValue::from_static(value).to_str().is_ok());
        }
    }

    #[test]
    fn hsts_defaults_off_outside_production() {
        env::remove_var("RUST_ENV");
        assert!(!hsts_enabled());
    }
}
