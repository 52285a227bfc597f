// src/coordinator.rs
//
// The order lifecycle: reserve funds, acquire a number, poll for the OTP
// under a bounded budget, and leave the wallet consistent on every exit.
// Every completed purchase attempt ends in exactly one of two ways: the
// order reaches OTP_RECEIVED, or the user holds a credit matching the
// debit. Nothing in between survives.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use utoipa::ToSchema;

use crate::models::{NewOrder, OrderStatus};
use crate::ports::{Catalog, Ledger, Notifier, OrderStore, SmsProvider, StorageError};
use crate::provider::{PollStatus, ProviderError};

const DEBIT_REASON: &str = "Number Purchase";
const CREDIT_RETRIES: u32 = 5;
const CREDIT_RETRY_DELAY: Duration = Duration::from_millis(500);
const STATUS_WRITE_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Poll attempts before the order times out (24 x 5s = the 2 minute budget).
    pub attempts: u32,
    pub interval: Duration,
    /// Flat markup added to every tier's base price. The same figure is
    /// displayed, debited, and refunded.
    pub surcharge: Decimal,
}

#[derive(Debug)]
pub enum PurchaseError {
    Blocked,
    ServerUnavailable,
    InsufficientFunds,
    /// The provider had no numbers for the service. The debit has already
    /// been refunded when this is returned.
    NoNumbers,
    /// Any other acquire failure. Also refunded before returning.
    Provider(ProviderError),
    Storage(StorageError),
}

impl fmt::Display for PurchaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseError::Blocked => write!(f, "user is blocked"),
            PurchaseError::ServerUnavailable => write!(f, "server unavailable"),
            PurchaseError::InsufficientFunds => write!(f, "insufficient balance"),
            PurchaseError::NoNumbers => write!(f, "no numbers available"),
            PurchaseError::Provider(e) => write!(f, "provider failure: {e}"),
            PurchaseError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PurchaseError {}

impl From<StorageError> for PurchaseError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseReceipt {
    pub order_id: i64,
    pub phone_number: String,
    pub price: Decimal,
}

enum PollOutcome {
    Otp(String),
    TimedOut,
    AdminCancelled,
    ProviderCancelled,
    Failed(ProviderError),
}

pub struct Coordinator {
    ledger: Arc<dyn Ledger>,
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn Catalog>,
    provider: Arc<dyn SmsProvider>,
    notifier: Arc<dyn Notifier>,
    config: PollConfig,
    in_flight: Mutex<HashMap<i64, Arc<Notify>>>,
}

impl Coordinator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        provider: Arc<dyn SmsProvider>,
        notifier: Arc<dyn Notifier>,
        config: PollConfig,
    ) -> Self {
        Self {
            ledger,
            orders,
            catalog,
            provider,
            notifier,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Runs the purchase up to the point where the number is in hand and the
    /// polling task is spawned. On any failure past the debit, the refund is
    /// issued before this returns.
    pub async fn purchase(
        self: &Arc<Self>,
        user_id: i64,
        service_id: i32,
        server_id: i32,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        if self.catalog.is_user_blocked(user_id).await? {
            return Err(PurchaseError::Blocked);
        }

        let Some(server) = self.catalog.server(server_id).await? else {
            return Err(PurchaseError::ServerUnavailable);
        };
        if !server.is_active || server.service_id != service_id {
            return Err(PurchaseError::ServerUnavailable);
        }
        let Some(service) = self.catalog.service(service_id).await? else {
            return Err(PurchaseError::ServerUnavailable);
        };
        if !service.is_active {
            return Err(PurchaseError::ServerUnavailable);
        }

        let price = server.price + self.config.surcharge;

        if !self.ledger.debit(user_id, price, DEBIT_REASON).await? {
            return Err(PurchaseError::InsufficientFunds);
        }

        // The debit is live from here on. Every exit below must either hand
        // over a number or put the money back first.
        let lease = match self
            .provider
            .acquire_number(&service.provider_service_code, service.country_id)
            .await
        {
            Ok(lease) => lease,
            Err(err) => {
                self.refund(user_id, price, "Refund").await;
                self.notifier
                    .notify(user_id, "❌ Failed. Refunded.")
                    .await;
                return Err(match err {
                    ProviderError::NoNumbers => PurchaseError::NoNumbers,
                    other => PurchaseError::Provider(other),
                });
            }
        };

        let order = NewOrder {
            user_id,
            service_id,
            server_id,
            phone_number: lease.phone_number.clone(),
            activation_id: lease.activation_id.clone(),
            status: OrderStatus::NumberReceived,
        };
        let order_id = match self.orders.create(order).await {
            Ok(id) => id,
            Err(err) => {
                // The number is rented but untracked: release it and refund.
                if let Err(e) = self.provider.cancel_number(&lease.activation_id).await {
                    log::warn!("number release after failed order create: {e}");
                }
                self.refund(user_id, price, "Refund").await;
                self.notifier
                    .notify(user_id, "❌ Failed. Refunded.")
                    .await;
                return Err(PurchaseError::Storage(err));
            }
        };

        self.notifier
            .notify(
                user_id,
                &format!("📞 Number: {}\n⏳ Waiting for OTP...", lease.phone_number),
            )
            .await;

        let cancel = Arc::new(Notify::new());
        self.in_flight.lock().await.insert(order_id, cancel.clone());

        let this = Arc::clone(self);
        let activation_id = lease.activation_id.clone();
        let service_name = service.service_name.clone();
        tokio::spawn(async move {
            this.await_delivery(order_id, user_id, activation_id, price, service_name, cancel)
                .await;
        });

        Ok(PurchaseReceipt {
            order_id,
            phone_number: lease.phone_number,
            price,
        })
    }

    /// Interrupts the polling task of an in-flight order. The task resolves
    /// through the same compensation path as a natural timeout. Returns
    /// false when the order is not (or no longer) in flight.
    pub async fn cancel(&self, order_id: i64) -> bool {
        match self.in_flight.lock().await.get(&order_id) {
            Some(handle) => {
                handle.notify_one();
                true
            }
            None => false,
        }
    }

    async fn await_delivery(
        &self,
        order_id: i64,
        user_id: i64,
        activation_id: String,
        price: Decimal,
        service_name: String,
        cancel: Arc<Notify>,
    ) {
        match self.poll_until_resolved(&activation_id, &cancel).await {
            PollOutcome::Otp(code) => {
                self.record_status(order_id, OrderStatus::OtpReceived, Some(&code))
                    .await;
                self.notifier
                    .notify(
                        user_id,
                        &format!("✅ OTP RECEIVED!\n🔢 {code}\n📱 {service_name}"),
                    )
                    .await;
            }
            PollOutcome::TimedOut => {
                self.abandon(
                    order_id,
                    user_id,
                    &activation_id,
                    price,
                    OrderStatus::Timeout,
                    "Refund - Timeout",
                    true,
                )
                .await;
            }
            PollOutcome::AdminCancelled => {
                self.abandon(
                    order_id,
                    user_id,
                    &activation_id,
                    price,
                    OrderStatus::Cancelled,
                    "Refund - Cancelled",
                    true,
                )
                .await;
            }
            PollOutcome::ProviderCancelled => {
                // The provider already dropped the activation; no release call.
                self.abandon(
                    order_id,
                    user_id,
                    &activation_id,
                    price,
                    OrderStatus::Cancelled,
                    "Refund - Cancelled",
                    false,
                )
                .await;
            }
            PollOutcome::Failed(err) => {
                log::error!("order {order_id}: poll failed: {err}");
                self.abandon(
                    order_id,
                    user_id,
                    &activation_id,
                    price,
                    OrderStatus::Failed,
                    "Refund",
                    true,
                )
                .await;
            }
        }

        self.in_flight.lock().await.remove(&order_id);
    }

    async fn poll_until_resolved(&self, activation_id: &str, cancel: &Notify) -> PollOutcome {
        for _ in 0..self.config.attempts {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = cancel.notified() => return PollOutcome::AdminCancelled,
            }

            match self.provider.poll_status(activation_id).await {
                Ok(PollStatus::OtpReceived(code)) => return PollOutcome::Otp(code),
                Ok(PollStatus::Waiting) | Ok(PollStatus::Unknown) => {}
                Ok(PollStatus::Cancelled) => return PollOutcome::ProviderCancelled,
                Err(err) => return PollOutcome::Failed(err),
            }
        }

        PollOutcome::TimedOut
    }

    /// The one compensation path for every abandoned order: release the
    /// number (best effort), restore the funds, record the terminal status,
    /// tell the user.
    async fn abandon(
        &self,
        order_id: i64,
        user_id: i64,
        activation_id: &str,
        price: Decimal,
        status: OrderStatus,
        reason: &str,
        release_number: bool,
    ) {
        if release_number {
            if let Err(e) = self.provider.cancel_number(activation_id).await {
                log::warn!("order {order_id}: number release failed: {e}");
            }
        }

        self.refund(user_id, price, reason).await;
        self.record_status(order_id, status, None).await;

        let text = match status {
            OrderStatus::Timeout => "⏳ OTP Timeout. Refunded.",
            OrderStatus::Cancelled => "🚫 Order cancelled. Refunded.",
            _ => "❌ Order failed. Refunded.",
        };
        self.notifier.notify(user_id, text).await;
    }

    /// Money safety beats everything else here: a failed compensating credit
    /// is retried, and a final failure is logged loudly instead of dropped.
    async fn refund(&self, user_id: i64, amount: Decimal, reason: &str) {
        for attempt in 1..=CREDIT_RETRIES {
            match self.ledger.credit(user_id, amount, reason).await {
                Ok(()) => return,
                Err(e) => {
                    log::error!(
                        "refund of {amount} to user {user_id} failed (attempt {attempt}/{CREDIT_RETRIES}): {e}"
                    );
                    if attempt < CREDIT_RETRIES {
                        tokio::time::sleep(CREDIT_RETRY_DELAY).await;
                    }
                }
            }
        }
        log::error!(
            "refund of {amount} to user {user_id} dropped after {CREDIT_RETRIES} attempts; manual correction required"
        );
    }

    async fn record_status(&self, order_id: i64, status: OrderStatus, otp: Option<&str>) {
        for attempt in 1..=STATUS_WRITE_RETRIES {
            match self.orders.update_status(order_id, status, otp).await {
                Ok(()) => return,
                Err(e) => {
                    log::error!(
                        "order {order_id}: status write {} failed (attempt {attempt}/{STATUS_WRITE_RETRIES}): {e}",
                        status.as_str()
                    );
                    if attempt < STATUS_WRITE_RETRIES {
                        tokio::time::sleep(CREDIT_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}
