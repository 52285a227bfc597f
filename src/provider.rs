// src/provider.rs
//
// Client for the hero-sms rental API (handler_api.php style). The provider
// answers with short pipe/colon-delimited text lines; everything is decoded
// into ProviderResponse right here and never string-matched downstream.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::fmt;

use crate::ports::SmsProvider;

pub const DEFAULT_BASE_URL: &str = "https://hero-sms.com/stubs/handler_api.php";

/// Provider-side status code for "cancel this activation".
const CANCEL_STATUS_CODE: &str = "8";

#[derive(Debug)]
pub enum ProviderError {
    /// The provider reported that no numbers are available for the service.
    NoNumbers,
    Http(reqwest::Error),
    Unexpected(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NoNumbers => write!(f, "no numbers available"),
            ProviderError::Http(e) => write!(f, "http error: {e}"),
            ProviderError::Unexpected(e) => write!(f, "unexpected provider response: {e}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLease {
    pub activation_id: String,
    pub phone_number: String,
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Waiting,
    OtpReceived(String),
    Cancelled,
    /// Anything the wire decoder did not recognize. Non-fatal; the caller
    /// keeps polling until its budget runs out.
    Unknown,
}

/// Everything the provider is known to say, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    AccessNumber {
        activation_id: String,
        phone_number: String,
    },
    AccessBalance(Decimal),
    AccessCancel,
    StatusOk(String),
    StatusWaitCode,
    StatusCancel,
    NoNumbers,
    NoBalance,
    BadKey,
    Unrecognized(String),
}

pub fn parse_response(raw: &str) -> ProviderResponse {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(3, ':');
    let tag = parts.next().unwrap_or("");
    match tag {
        "ACCESS_NUMBER" => match (parts.next(), parts.next()) {
            (Some(id), Some(phone)) if !id.is_empty() && !phone.is_empty() => {
                ProviderResponse::AccessNumber {
                    activation_id: id.to_string(),
                    phone_number: phone.to_string(),
                }
            }
            _ => ProviderResponse::Unrecognized(trimmed.to_string()),
        },
        "ACCESS_BALANCE" => match parts.next().and_then(|v| v.parse::<Decimal>().ok()) {
            Some(amount) => ProviderResponse::AccessBalance(amount),
            None => ProviderResponse::Unrecognized(trimmed.to_string()),
        },
        "ACCESS_CANCEL" => ProviderResponse::AccessCancel,
        "STATUS_OK" => match parts.next() {
            Some(code) if !code.is_empty() => ProviderResponse::StatusOk(code.to_string()),
            _ => ProviderResponse::Unrecognized(trimmed.to_string()),
        },
        "STATUS_WAIT_CODE" => ProviderResponse::StatusWaitCode,
        "STATUS_CANCEL" => ProviderResponse::StatusCancel,
        "NO_NUMBERS" => ProviderResponse::NoNumbers,
        "NO_BALANCE" => ProviderResponse::NoBalance,
        "BAD_KEY" => ProviderResponse::BadKey,
        _ => ProviderResponse::Unrecognized(trimmed.to_string()),
    }
}

pub struct HeroSmsClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HeroSmsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<ProviderResponse, ProviderError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Unexpected(format!(
                "status={status} body={body}"
            )));
        }

        Ok(parse_response(&body))
    }
}

#[async_trait]
impl SmsProvider for HeroSmsClient {
    async fn acquire_number(
        &self,
        service_code: &str,
        country_id: i32,
    ) -> Result<NumberLease, ProviderError> {
        let country = country_id.to_string();
        match self
            .call(&[
                ("action", "getNumber"),
                ("service", service_code),
                ("country", &country),
            ])
            .await?
        {
            ProviderResponse::AccessNumber {
                activation_id,
                phone_number,
            } => Ok(NumberLease {
                activation_id,
                phone_number,
            }),
            ProviderResponse::NoNumbers => Err(ProviderError::NoNumbers),
            other => Err(ProviderError::Unexpected(format!("{other:?}"))),
        }
    }

    async fn poll_status(&self, activation_id: &str) -> Result<PollStatus, ProviderError> {
        match self
            .call(&[("action", "getStatus"), ("id", activation_id)])
            .await?
        {
            ProviderResponse::StatusOk(code) => Ok(PollStatus::OtpReceived(code)),
            ProviderResponse::StatusWaitCode => Ok(PollStatus::Waiting),
            ProviderResponse::StatusCancel => Ok(PollStatus::Cancelled),
            other => {
                log::warn!("activation {activation_id}: unrecognized status {other:?}");
                Ok(PollStatus::Unknown)
            }
        }
    }

    async fn cancel_number(&self, activation_id: &str) -> Result<(), ProviderError> {
        match self
            .call(&[
                ("action", "setStatus"),
                ("id", activation_id),
                ("status", CANCEL_STATUS_CODE),
            ])
            .await?
        {
            ProviderResponse::AccessCancel => Ok(()),
            other => Err(ProviderError::Unexpected(format!("{other:?}"))),
        }
    }

    async fn account_balance(&self) -> Result<Decimal, ProviderError> {
        match self.call(&[("action", "getBalance")]).await? {
            ProviderResponse::AccessBalance(amount) => Ok(amount),
            other => Err(ProviderError::Unexpected(format!("{other:?}"))),
        }
    }
}
