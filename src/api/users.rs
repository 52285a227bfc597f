// src/api/users.rs

use actix_web::{HttpResponse, Responder, get, post, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, db};

#[derive(Debug, Deserialize)]
pub struct EnsureUserRequest {
    pub user_id: i64,
    pub referred_by: Option<i64>,
}

/// First-contact registration. Idempotent; the referrer from the first call
/// wins.
#[post("/users")]
pub async fn ensure_user(
    state: web::Data<AppState>,
    payload: web::Json<EnsureUserRequest>,
) -> impl Responder {
    match db::ensure_user(&state.pool, payload.user_id, payload.referred_by).await {
        Ok(()) => HttpResponse::Ok().json(json!({"ok": true})),
        Err(e) => {
            log::error!("ensure_user db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/users/{id}/balance")]
pub async fn user_balance(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let user_id = path.into_inner();
    match state.ledger.balance(user_id).await {
        Ok(balance) => HttpResponse::Ok().json(json!({"user_id": user_id, "balance": balance})),
        Err(e) => {
            log::error!("balance read for user {user_id} failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletRequestBody {
    pub user_id: i64,
    pub amount: Decimal,
    pub screenshot_url: Option<String>,
}

/// Manual recharge request, reviewed by an operator out of band.
#[post("/wallet-requests")]
pub async fn create_wallet_request(
    state: web::Data<AppState>,
    payload: web::Json<WalletRequestBody>,
) -> impl Responder {
    let payload = payload.into_inner();

    if payload.amount < state.config.minimum_recharge {
        return HttpResponse::BadRequest().json(json!({
            "error": format!("minimum recharge is {}", state.config.minimum_recharge)
        }));
    }

    match db::create_wallet_request(
        &state.pool,
        payload.user_id,
        payload.amount,
        payload.screenshot_url.as_deref(),
    )
    .await
    {
        Ok(id) => HttpResponse::Ok().json(json!({"request_id": id})),
        Err(e) => {
            log::error!("create_wallet_request db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
