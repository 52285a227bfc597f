// src/notify.rs

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;

use crate::ports::{Notifier, ReferralHook};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delivers user-facing messages through the Telegram Bot API. Failures are
/// logged and swallowed: a lost notification must never stall or fail the
/// order that produced it.
pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: i64, text: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = json!({ "chat_id": user_id, "text": text });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                log::warn!("sendMessage to {user_id} failed: status={}", resp.status());
            }
            Err(e) => {
                log::warn!("sendMessage to {user_id} failed: {e}");
            }
        }
    }
}

/// Placeholder referral program: records qualifying recharges without
/// crediting anything. A real implementation plugs in behind ReferralHook.
pub struct LogOnlyReferral {
    pub bonus: Decimal,
}

#[async_trait]
impl ReferralHook for LogOnlyReferral {
    async fn on_recharge(&self, user_id: i64, amount: Decimal, referred_by: Option<i64>) {
        if let Some(referrer) = referred_by {
            log::info!(
                "recharge of {amount} by user {user_id} referred by {referrer}; bonus {} not auto-credited",
                self.bonus
            );
        }
    }
}
