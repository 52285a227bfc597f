// src/api/webhook.rs
//
// Payment-gateway callback. The signature is an HMAC-SHA256 over the raw
// request body; only a verified `payment.captured` event touches the
// wallet. Verified-but-unusable payloads are acknowledged with 200 so the
// gateway stops retrying them.

use actix_web::{HttpRequest, HttpResponse, post, web};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use utoipa::ToSchema;

use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";
const RECHARGE_REASON: &str = "Razorpay Recharge";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RazorpayEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Option<RazorpayEventPayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RazorpayEventPayload {
    pub payment: Option<RazorpayPaymentWrapper>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RazorpayPaymentWrapper {
    pub entity: Option<RazorpayPayment>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RazorpayPayment {
    /// Captured amount in minor units (paise).
    pub amount: i64,
    /// Free-form metadata; the recharge flow puts the wallet owner's id here.
    #[serde(default)]
    pub notes: serde_json::Value,
}

/// Constant-time check of the hex signature against the raw body.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

fn note_user_id(notes: &serde_json::Value) -> Option<i64> {
    match notes.get("user_id") {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        _ => None,
    }
}

#[utoipa::path(
    post,
    path = "/webhook/razorpay",
    tag = "webhooks",
    request_body = RazorpayEvent,
    responses(
        (status = 200, description = "Processed or acknowledged-and-ignored"),
        (status = 400, description = "Invalid signature; no state change"),
        (status = 500, description = "Credit write failed; gateway should retry")
    )
)]
#[post("/webhook/razorpay")]
pub async fn razorpay_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&state.config.webhook_secret, &body, signature) {
        log::warn!("razorpay webhook rejected: bad signature");
        return HttpResponse::BadRequest().json(json!({"status": "invalid signature"}));
    }

    let Ok(event) = serde_json::from_slice::<RazorpayEvent>(&body) else {
        return HttpResponse::Ok().json(json!({"status": "ignored"}));
    };
    if event.event != "payment.captured" {
        return HttpResponse::Ok().json(json!({"status": "ignored"}));
    }
    let Some(payment) = event.payload.and_then(|p| p.payment).and_then(|p| p.entity) else {
        return HttpResponse::Ok().json(json!({"status": "ignored"}));
    };
    let Some(user_id) = note_user_id(&payment.notes).filter(|id| *id > 0) else {
        return HttpResponse::Ok().json(json!({"status": "ignored"}));
    };

    // paise -> rupees
    let amount = Decimal::new(payment.amount, 2);

    if let Err(e) = state.ledger.credit(user_id, amount, RECHARGE_REASON).await {
        log::error!("webhook credit of {amount} to user {user_id} failed: {e}");
        return HttpResponse::InternalServerError().finish();
    }
    log::info!("webhook credited {amount} to user {user_id}");

    let referred_by = match state.catalog.referred_by(user_id).await {
        Ok(referrer) => referrer,
        Err(e) => {
            log::warn!("referrer lookup for user {user_id} failed: {e}");
            None
        }
    };
    state.referrals.on_recharge(user_id, amount, referred_by).await;
    state
        .notifier
        .notify(user_id, &format!("💰 Wallet recharged: ₹{amount}"))
        .await;

    HttpResponse::Ok().json(json!({"status": "ok"}))
}
