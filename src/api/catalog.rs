// src/api/catalog.rs

use actix_web::{HttpResponse, Responder, get, web};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AppState, db};

#[get("/services")]
pub async fn list_services(state: web::Data<AppState>) -> impl Responder {
    match db::active_services(&state.pool).await {
        Ok(services) => HttpResponse::Ok().json(services),
        Err(e) => {
            log::error!("list_services db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// A purchasable tier as shown to the user: the price already carries the
/// flat surcharge, so what is displayed is exactly what gets debited.
#[derive(Debug, Serialize)]
pub struct ServerOffer {
    pub id: i32,
    pub server_number: i32,
    pub price: Decimal,
}

#[get("/services/{id}/servers")]
pub async fn list_servers(state: web::Data<AppState>, path: web::Path<i32>) -> impl Responder {
    let service_id = path.into_inner();
    match db::active_servers(&state.pool, service_id).await {
        Ok(tiers) => {
            let offers: Vec<ServerOffer> = tiers
                .into_iter()
                .map(|t| ServerOffer {
                    id: t.id,
                    server_number: t.server_number,
                    price: t.price + state.config.price_surcharge,
                })
                .collect();
            HttpResponse::Ok().json(offers)
        }
        Err(e) => {
            log::error!("list_servers db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
