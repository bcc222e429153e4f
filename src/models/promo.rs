use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// A discount code. `used_count` moves only when an order carrying the code
/// transitions to paid; validation itself is side-effect-free so abandoned
/// checkouts never burn a use.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub event_id: Option<Uuid>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a code was refused. The wording is shown verbatim in the checkout UI,
/// so each variant carries a human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    NotFound,
    Inactive,
    NotYetValid,
    Expired,
    UsageLimitReached,
    WrongEvent,
}

impl PromoRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "This code does not exist",
            Self::Inactive => "This code is no longer active",
            Self::NotYetValid => "This code is not valid yet",
            Self::Expired => "This code has expired",
            Self::UsageLimitReached => "This code has reached its usage limit",
            Self::WrongEvent => "This code is not valid for this event",
        }
    }
}

/// Outcome of a read-only validation, shaped for the checkout UI.
#[derive(Debug, Clone, Serialize)]
pub struct PromoEvaluation {
    pub valid: bool,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub reason: Option<&'static str>,
}

impl PromoEvaluation {
    pub fn accepted(code: &PromoCode) -> Self {
        Self {
            valid: true,
            discount_type: Some(code.discount_type),
            discount_value: Some(code.discount_value),
            reason: None,
        }
    }

    pub fn rejected(rejection: PromoRejection) -> Self {
        Self {
            valid: false,
            discount_type: None,
            discount_value: None,
            reason: Some(rejection.reason()),
        }
    }
}

impl PromoCode {
    /// Rule evaluation against a loaded row. Pure: the caller decides what to
    /// do with the verdict, and nothing here touches `used_count`.
    pub fn evaluate(&self, event_id: Uuid, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if let Some(code_event) = self.event_id {
            if code_event != event_id {
                return Err(PromoRejection::WrongEvent);
            }
        }
        if now < self.valid_from {
            return Err(PromoRejection::NotYetValid);
        }
        if now > self.valid_until {
            return Err(PromoRejection::Expired);
        }
        if let Some(max) = self.max_uses {
            if self.used_count >= max {
                return Err(PromoRejection::UsageLimitReached);
            }
        }
        Ok(())
    }
}
