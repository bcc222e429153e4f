use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scan_result", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    Valid,
    AlreadyUsed,
    Invalid,
    Expired,
    Unauthorized,
}

impl ScanResult {
    /// Message shown on the scanner device. Invalid tokens deliberately get
    /// no further detail.
    pub fn message(self) -> &'static str {
        match self {
            ScanResult::Valid => "Ticket valid",
            ScanResult::AlreadyUsed => "Ticket already used",
            ScanResult::Invalid => "Invalid ticket",
            ScanResult::Expired => "Ticket no longer valid",
            ScanResult::Unauthorized => "Not permitted to scan this ticket",
        }
    }
}

/// One row per scan attempt, success or failure. Append-only: entry disputes
/// are settled from this table.
#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanLog {
    pub id: Uuid,
    pub ticket_wallet_id: Option<Uuid>,
    pub scanner_user_id: Uuid,
    pub scanned_at: DateTime<Utc>,
    pub location: Option<String>,
    pub device_info: Option<String>,
    pub result: ScanResult,
}
