//! Expiry computation shared by holds and transfers.

use chrono::{DateTime, Duration, Utc};

use crate::utils::error::AppError;

/// Deadline for a claim created now with the given time-to-live.
pub fn deadline_after(
    now: DateTime<Utc>,
    ttl: std::time::Duration,
) -> Result<DateTime<Utc>, AppError> {
    let ttl = Duration::from_std(ttl)
        .map_err(|_| AppError::ValidationError("TTL is out of range".to_string()))?;
    Ok(now + ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_now_plus_ttl() {
        let now = Utc::now();
        let deadline = deadline_after(now, std::time::Duration::from_secs(600)).unwrap();
        assert_eq!(deadline - now, Duration::seconds(600));
    }

    #[test]
    fn absurd_ttl_is_rejected() {
        let now = Utc::now();
        assert!(deadline_after(now, std::time::Duration::from_secs(u64::MAX)).is_err());
    }
}
