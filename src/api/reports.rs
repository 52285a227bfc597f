// src/api/reports.rs

use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// Number of records to return, newest first (default 50).
    pub limit: Option<i64>,
}

/// Read-only order feed for the reporting dashboard.
#[utoipa::path(
    get,
    path = "/api/orders/recent",
    tag = "reports",
    params(RecentQuery),
    responses(
        (status = 200, description = "Most recent orders", body = [crate::models::Order]),
        (status = 500, description = "Storage failure")
    )
)]
#[get("/orders/recent")]
pub async fn recent_orders(
    state: web::Data<AppState>,
    query: web::Query<RecentQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    match state.orders.recent(limit).await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => {
            log::error!("recent_orders db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Remaining balance in the provider account.
#[get("/provider/balance")]
pub async fn provider_balance(state: web::Data<AppState>) -> impl Responder {
    match state.provider.account_balance().await {
        Ok(balance) => HttpResponse::Ok().json(json!({"balance": balance})),
        Err(e) => {
            log::error!("provider balance check failed: {e}");
            HttpResponse::BadGateway().finish()
        }
    }
}
