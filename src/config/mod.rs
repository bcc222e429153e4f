use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

/// Runtime configuration, read once at startup. Tunables fall back to the
/// defaults the product shipped with; secrets and the database URL must be
/// present.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// Server-held secret for QR token signing.
    pub qr_signing_secret: String,
    /// How long a checkout hold pins inventory.
    pub hold_ttl: Duration,
    /// How long a proposed transfer stays open.
    pub transfer_ttl: Duration,
    /// Cadence of the expiry sweep job.
    pub sweep_interval: Duration,
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_HOLD_TTL_SECS: u64 = 600;
const DEFAULT_TRANSFER_TTL_SECS: u64 = 86_400;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
                .parse()
                .expect("BIND_ADDR must be a valid socket address"),
            max_connections: parse_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            qr_signing_secret: env::var("QR_SIGNING_SECRET")
                .expect("QR_SIGNING_SECRET must be set"),
            hold_ttl: Duration::from_secs(parse_or("HOLD_TTL_SECS", DEFAULT_HOLD_TTL_SECS)),
            transfer_ttl: Duration::from_secs(parse_or(
                "TRANSFER_TTL_SECS",
                DEFAULT_TRANSFER_TTL_SECS,
            )),
            sweep_interval: Duration::from_secs(parse_or(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{var}={raw} is not valid, using the default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        env::set_var("TEST_PARSE_OR_GARBAGE", "not-a-number");
        assert_eq!(parse_or::<u64>("TEST_PARSE_OR_GARBAGE", 42), 42);
        env::remove_var("TEST_PARSE_OR_GARBAGE");
    }

    #[test]
    fn parse_or_reads_valid_values() {
        env::set_var("TEST_PARSE_OR_VALID", "120");
        assert_eq!(parse_or::<u64>("TEST_PARSE_OR_VALID", 42), 120);
        env::remove_var("TEST_PARSE_OR_VALID");
    }

    #[test]
    fn parse_or_defaults_when_unset() {
        env::remove_var("TEST_PARSE_OR_UNSET");
        assert_eq!(parse_or::<u32>("TEST_PARSE_OR_UNSET", 7), 7);
    }
}
