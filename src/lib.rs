pub mod api;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod docs;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod ports;
pub mod provider;

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::ports::{Catalog, Ledger, Notifier, OrderStore, ReferralHook, SmsProvider};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub ledger: Arc<dyn Ledger>,
    pub orders: Arc<dyn OrderStore>,
    pub catalog: Arc<dyn Catalog>,
    pub provider: Arc<dyn SmsProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub referrals: Arc<dyn ReferralHook>,
    pub coordinator: Arc<Coordinator>,
}
