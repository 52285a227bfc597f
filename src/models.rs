// src/models.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: i32,
    pub service_name: String,
    pub provider_service_code: String,
    pub country_id: i32,
    pub is_active: bool,
}

/// One price tier of a service ("server" in the provider's terms).
/// The stored price is the base price; the flat surcharge is added on top
/// when the tier is displayed or charged.
#[derive(Debug, Clone, Serialize)]
pub struct ServerTier {
    pub id: i32,
    pub service_id: i32,
    pub server_number: i32,
    pub price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    NumberReceived,
    OtpReceived,
    Cancelled,
    Timeout,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::NumberReceived => "NUMBER_RECEIVED",
            OrderStatus::OtpReceived => "OTP_RECEIVED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Timeout => "TIMEOUT",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "NUMBER_RECEIVED" => Ok(OrderStatus::NumberReceived),
            "OTP_RECEIVED" => Ok(OrderStatus::OtpReceived),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "TIMEOUT" => Ok(OrderStatus::Timeout),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    Credit,
    Debit,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Credit => "CREDIT",
            TxKind::Debit => "DEBIT",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i32,
    pub server_id: i32,
    pub phone_number: Option<String>,
    pub activation_id: Option<String>,
    pub status: OrderStatus,
    pub otp: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a freshly acquired number. Orders only come into
/// existence once the provider has handed out a lease.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub service_id: i32,
    pub server_id: i32,
    pub phone_number: String,
    pub activation_id: String,
    pub status: OrderStatus,
}
