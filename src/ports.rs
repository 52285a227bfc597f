// src/ports.rs
//
// Seams between the lifecycle coordinator and everything it drives.
// Production wiring lives in ledger.rs / db.rs / provider.rs / notify.rs;
// tests substitute in-memory fakes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

use crate::models::{NewOrder, Order, OrderStatus, ServerTier, Service};
use crate::provider::{NumberLease, PollStatus, ProviderError};

#[derive(Debug)]
pub struct StorageError(pub String);

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage error: {}", self.0)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        Self(value.to_string())
    }
}

/// Wallet balance mutation plus the transaction log, as one unit.
///
/// `debit` is the only conditional operation: it succeeds iff the balance
/// covers the amount, and the check-and-mutate must be atomic under
/// concurrent calls for the same user. Insufficient funds is `Ok(false)`,
/// not an error.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn debit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<bool, StorageError>;
    async fn credit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<(), StorageError>;
    async fn balance(&self, user_id: i64) -> Result<Decimal, StorageError>;
}

/// Order persistence. No business rules here; status decisions belong to
/// the coordinator that owns the order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<i64, StorageError>;
    async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        otp: Option<&str>,
    ) -> Result<(), StorageError>;
    async fn get(&self, order_id: i64) -> Result<Option<Order>, StorageError>;
    async fn recent(&self, limit: i64) -> Result<Vec<Order>, StorageError>;
}

/// Read-only lookups against the user directory and the service catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn is_user_blocked(&self, user_id: i64) -> Result<bool, StorageError>;
    async fn referred_by(&self, user_id: i64) -> Result<Option<i64>, StorageError>;
    async fn service(&self, service_id: i32) -> Result<Option<Service>, StorageError>;
    async fn server(&self, server_id: i32) -> Result<Option<ServerTier>, StorageError>;
}

/// The upstream SMS-rental API. Single-shot calls, no internal retry.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn acquire_number(
        &self,
        service_code: &str,
        country_id: i32,
    ) -> Result<NumberLease, ProviderError>;
    async fn poll_status(&self, activation_id: &str) -> Result<PollStatus, ProviderError>;
    async fn cancel_number(&self, activation_id: &str) -> Result<(), ProviderError>;
    async fn account_balance(&self) -> Result<Decimal, ProviderError>;
}

/// Outbound user messaging. Fire-and-forget: delivery failures are the
/// implementation's problem to log, never the caller's to handle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str);
}

/// Boundary for the referral program. Invoked after every successful wallet
/// recharge; crediting a bonus (if any) is up to the implementation.
#[async_trait]
pub trait ReferralHook: Send + Sync {
    async fn on_recharge(&self, user_id: i64, amount: Decimal, referred_by: Option<i64>);
}
