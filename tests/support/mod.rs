#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use tokio::sync::Mutex;

use otp_rental::AppState;
use otp_rental::config::Config;
use otp_rental::coordinator::{Coordinator, PollConfig};
use otp_rental::models::{NewOrder, Order, OrderStatus, ServerTier, Service, TxKind};
use otp_rental::notify::LogOnlyReferral;
use otp_rental::ports::{Catalog, Ledger, Notifier, OrderStore, SmsProvider, StorageError};
use otp_rental::provider::{NumberLease, PollStatus, ProviderError};

pub struct Entry {
    pub user_id: i64,
    pub amount: Decimal,
    pub kind: TxKind,
    pub reason: String,
}

#[derive(Default)]
pub struct LedgerState {
    pub balances: HashMap<i64, Decimal>,
    pub entries: Vec<Entry>,
}

/// In-memory ledger honoring the same contract as the Postgres one: the
/// funds check and the mutation happen under a single lock, one entry per
/// mutation. `credit_failures` makes the next N credits fail, for
/// compensation-retry tests.
#[derive(Default)]
pub struct MemLedger {
    pub state: Mutex<LedgerState>,
    pub credit_failures: AtomicUsize,
}

impl MemLedger {
    pub fn with_balance(user_id: i64, balance: Decimal) -> Self {
        let ledger = Self::default();
        ledger
            .state
            .try_lock()
            .expect("fresh ledger")
            .balances
            .insert(user_id, balance);
        ledger
    }

    pub async fn signed_sum(&self, user_id: i64) -> Decimal {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| match e.kind {
                TxKind::Credit => e.amount,
                TxKind::Debit => -e.amount,
            })
            .sum()
    }
}

#[async_trait]
impl Ledger for MemLedger {
    async fn debit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        let balance = state.balances.get(&user_id).copied().unwrap_or_default();
        if balance < amount {
            return Ok(false);
        }
        state.balances.insert(user_id, balance - amount);
        state.entries.push(Entry {
            user_id,
            amount,
            kind: TxKind::Debit,
            reason: reason.to_string(),
        });
        Ok(true)
    }

    async fn credit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<(), StorageError> {
        if self
            .credit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError("injected credit failure".to_string()));
        }

        let mut state = self.state.lock().await;
        let balance = state.balances.get(&user_id).copied().unwrap_or_default();
        state.balances.insert(user_id, balance + amount);
        state.entries.push(Entry {
            user_id,
            amount,
            kind: TxKind::Credit,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> Result<Decimal, StorageError> {
        let state = self.state.lock().await;
        Ok(state.balances.get(&user_id).copied().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemOrdersState {
    pub next_id: i64,
    pub orders: HashMap<i64, Order>,
    pub history: Vec<(i64, OrderStatus)>,
}

#[derive(Default)]
pub struct MemOrders {
    pub inner: Mutex<MemOrdersState>,
}

#[async_trait]
impl OrderStore for MemOrders {
    async fn create(&self, order: NewOrder) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.orders.insert(
            id,
            Order {
                id,
                user_id: order.user_id,
                service_id: order.service_id,
                server_id: order.server_id,
                phone_number: Some(order.phone_number),
                activation_id: Some(order.activation_id),
                status: order.status,
                otp: None,
                created_at: now,
                updated_at: now,
            },
        );
        inner.history.push((id, order.status));
        Ok(id)
    }

    async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        otp: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Err(StorageError(format!("no order {order_id}")));
        };
        order.status = status;
        if let Some(otp) = otp {
            order.otp = Some(otp.to_string());
        }
        order.updated_at = Utc::now();
        inner.history.push((order_id, status));
        Ok(())
    }

    async fn get(&self, order_id: i64) -> Result<Option<Order>, StorageError> {
        Ok(self.inner.lock().await.orders.get(&order_id).cloned())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Order>, StorageError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit as usize);
        Ok(orders)
    }
}

#[derive(Default)]
pub struct MemCatalog {
    pub services: Vec<Service>,
    pub servers: Vec<ServerTier>,
    pub blocked: Vec<i64>,
    pub referrers: HashMap<i64, i64>,
}

impl MemCatalog {
    /// WhatsApp on server 10 at base price 55: with the flat 5 surcharge the
    /// charged price is 60, matching the reference scenarios.
    pub fn fixture() -> Self {
        Self {
            services: vec![Service {
                id: 1,
                service_name: "WhatsApp".to_string(),
                provider_service_code: "wa".to_string(),
                country_id: 22,
                is_active: true,
            }],
            servers: vec![ServerTier {
                id: 10,
                service_id: 1,
                server_number: 1,
                price: dec!(55),
                is_active: true,
            }],
            blocked: Vec::new(),
            referrers: HashMap::new(),
        }
    }
}

#[async_trait]
impl Catalog for MemCatalog {
    async fn is_user_blocked(&self, user_id: i64) -> Result<bool, StorageError> {
        Ok(self.blocked.contains(&user_id))
    }

    async fn referred_by(&self, user_id: i64) -> Result<Option<i64>, StorageError> {
        Ok(self.referrers.get(&user_id).copied())
    }

    async fn service(&self, service_id: i32) -> Result<Option<Service>, StorageError> {
        Ok(self.services.iter().find(|s| s.id == service_id).cloned())
    }

    async fn server(&self, server_id: i32) -> Result<Option<ServerTier>, StorageError> {
        Ok(self.servers.iter().find(|s| s.id == server_id).cloned())
    }
}

pub enum AcquireScript {
    Lease(NumberLease),
    NoNumbers,
    Fail(String),
}

pub enum PollScript {
    Status(PollStatus),
    Error(String),
}

/// Provider fake driven by a fixed script: `poll_script` entries are
/// consumed in order, and an exhausted script keeps answering Waiting.
pub struct ScriptedProvider {
    pub acquire: AcquireScript,
    pub poll_script: Mutex<Vec<PollScript>>,
    pub acquires: AtomicUsize,
    pub polls: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(acquire: AcquireScript, poll_script: Vec<PollScript>) -> Self {
        Self {
            acquire,
            poll_script: Mutex::new(poll_script),
            acquires: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn leasing(activation_id: &str, phone_number: &str, poll_script: Vec<PollScript>) -> Self {
        Self::new(
            AcquireScript::Lease(NumberLease {
                activation_id: activation_id.to_string(),
                phone_number: phone_number.to_string(),
            }),
            poll_script,
        )
    }
}

#[async_trait]
impl SmsProvider for ScriptedProvider {
    async fn acquire_number(
        &self,
        _service_code: &str,
        _country_id: i32,
    ) -> Result<NumberLease, ProviderError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        match &self.acquire {
            AcquireScript::Lease(lease) => Ok(lease.clone()),
            AcquireScript::NoNumbers => Err(ProviderError::NoNumbers),
            AcquireScript::Fail(msg) => Err(ProviderError::Unexpected(msg.clone())),
        }
    }

    async fn poll_status(&self, _activation_id: &str) -> Result<PollStatus, ProviderError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.poll_script.lock().await;
        if script.is_empty() {
            return Ok(PollStatus::Waiting);
        }
        match script.remove(0) {
            PollScript::Status(status) => Ok(status),
            PollScript::Error(msg) => Err(ProviderError::Unexpected(msg)),
        }
    }

    async fn cancel_number(&self, _activation_id: &str) -> Result<(), ProviderError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn account_balance(&self) -> Result<Decimal, ProviderError> {
        Ok(dec!(0))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub async fn texts_for(&self, user_id: i64) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, text: &str) {
        self.messages
            .lock()
            .await
            .push((user_id, text.to_string()));
    }
}

pub fn fast_poll(attempts: u32) -> PollConfig {
    PollConfig {
        attempts,
        interval: Duration::from_millis(5),
        surcharge: dec!(5),
    }
}

pub struct World {
    pub ledger: Arc<MemLedger>,
    pub orders: Arc<MemOrders>,
    pub catalog: Arc<MemCatalog>,
    pub provider: Arc<ScriptedProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: Arc<Coordinator>,
}

pub fn world(
    ledger: MemLedger,
    catalog: MemCatalog,
    provider: ScriptedProvider,
    poll: PollConfig,
) -> World {
    let ledger = Arc::new(ledger);
    let orders = Arc::new(MemOrders::default());
    let catalog = Arc::new(catalog);
    let provider = Arc::new(provider);
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = Arc::new(Coordinator::new(
        ledger.clone(),
        orders.clone(),
        catalog.clone(),
        provider.clone(),
        notifier.clone(),
        poll,
    ));

    World {
        ledger,
        orders,
        catalog,
        provider,
        notifier,
        coordinator,
    }
}

/// Polls the fake order store until the order reaches the wanted status.
pub async fn wait_for_status(
    orders: &MemOrders,
    order_id: i64,
    status: OrderStatus,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        {
            let inner = orders.inner.lock().await;
            if inner.orders.get(&order_id).map(|o| o.status) == Some(status) {
                return true;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn test_config(webhook_secret: &str) -> Config {
    Config {
        database_url: "postgres://postgres@localhost/otp_rental_test".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        provider_api_key: "test-key".to_string(),
        provider_base_url: "http://localhost/stubs/handler_api.php".to_string(),
        bot_token: "test-token".to_string(),
        telegram_api_base: "http://localhost".to_string(),
        webhook_secret: webhook_secret.to_string(),
        minimum_recharge: dec!(30),
        referral_bonus: dec!(10),
        price_surcharge: dec!(5),
        poll_attempts: 24,
        poll_interval: Duration::from_millis(5),
    }
}

/// AppState over the in-memory fakes. The pool is lazy and never connected;
/// handlers under test must not touch it.
pub fn build_state(world: &World, config: Config) -> AppState {
    let config = Arc::new(config);
    AppState {
        pool: PgPool::connect_lazy(&config.database_url).expect("lazy pool"),
        config: config.clone(),
        ledger: world.ledger.clone(),
        orders: world.orders.clone(),
        catalog: world.catalog.clone(),
        provider: world.provider.clone(),
        notifier: world.notifier.clone(),
        referrals: Arc::new(LogOnlyReferral {
            bonus: config.referral_bonus,
        }),
        coordinator: world.coordinator.clone(),
    }
}

/// Connects to TEST_DATABASE_URL and runs migrations, or skips the test.
pub async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    Some(pool)
}
