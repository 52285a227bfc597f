// src/api/purchase.rs

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::AppState;
use crate::coordinator::PurchaseError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub user_id: i64,
    pub service_id: i32,
    pub server_id: i32,
}

/// Entry point for the chat front end: buys a number for the selected
/// service/tier and kicks off OTP polling. Whenever the response is an
/// error past the funds check, the wallet has already been refunded.
#[utoipa::path(
    post,
    path = "/api/purchase",
    tag = "orders",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Number acquired, polling started", body = crate::coordinator::PurchaseReceipt),
        (status = 402, description = "Insufficient balance"),
        (status = 403, description = "User is blocked"),
        (status = 404, description = "Unknown or inactive service/server"),
        (status = 502, description = "Provider failure; wallet refunded"),
        (status = 500, description = "Storage failure")
    )
)]
#[post("/purchase")]
pub async fn purchase_number(
    state: web::Data<AppState>,
    payload: web::Json<PurchaseRequest>,
) -> HttpResponse {
    let req = payload.into_inner();

    match state
        .coordinator
        .purchase(req.user_id, req.service_id, req.server_id)
        .await
    {
        Ok(receipt) => HttpResponse::Ok().json(receipt),
        Err(PurchaseError::Blocked) => {
            HttpResponse::Forbidden().json(json!({"error": "user is blocked"}))
        }
        Err(PurchaseError::InsufficientFunds) => {
            HttpResponse::PaymentRequired().json(json!({"error": "insufficient balance"}))
        }
        Err(PurchaseError::ServerUnavailable) => {
            HttpResponse::NotFound().json(json!({"error": "server unavailable"}))
        }
        Err(PurchaseError::NoNumbers) => HttpResponse::BadGateway()
            .json(json!({"error": "no numbers available", "refunded": true})),
        Err(PurchaseError::Provider(e)) => {
            log::error!("purchase provider error: {e}");
            HttpResponse::BadGateway().json(json!({"error": "provider failure", "refunded": true}))
        }
        Err(PurchaseError::Storage(e)) => {
            log::error!("purchase storage error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Admin-triggered cancel of an in-flight order. The polling task resolves
/// through the same compensation path as a timeout.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    tag = "orders",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 202, description = "Cancel signalled to the polling task"),
        (status = 404, description = "Order is not in flight")
    )
)]
#[post("/orders/{id}/cancel")]
pub async fn cancel_order(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let order_id = path.into_inner();
    if state.coordinator.cancel(order_id).await {
        HttpResponse::Accepted().json(json!({"ok": true}))
    } else {
        HttpResponse::NotFound().json(json!({"error": "order is not in flight"}))
    }
}
