// src/config.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::time::Duration;

use crate::{notify, provider};

/// All process configuration, read once at startup and passed around by
/// reference. Missing required variables abort the boot, like the rest of
/// the startup path.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub provider_api_key: String,
    pub provider_base_url: String,
    pub bot_token: String,
    pub telegram_api_base: String,
    pub webhook_secret: String,
    pub minimum_recharge: Decimal,
    pub referral_bonus: Decimal,
    pub price_surcharge: Decimal,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            provider_api_key: env::var("HEROSMS_API_KEY").expect("HEROSMS_API_KEY required"),
            provider_base_url: env::var("HEROSMS_BASE_URL")
                .unwrap_or_else(|_| provider::DEFAULT_BASE_URL.to_string()),
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN required"),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| notify::TELEGRAM_API_BASE.to_string()),
            webhook_secret: env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET required"),
            minimum_recharge: parse_env("MINIMUM_RECHARGE", dec!(30)),
            referral_bonus: parse_env("REFERRAL_BONUS", dec!(10)),
            price_surcharge: parse_env("PRICE_SURCHARGE", dec!(5)),
            poll_attempts: parse_env("POLL_ATTEMPTS", 24),
            poll_interval: Duration::from_secs(parse_env("POLL_INTERVAL_SECS", 5)),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
