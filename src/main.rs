// src/main.rs

use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use otp_rental::config::Config;
use otp_rental::coordinator::{Coordinator, PollConfig};
use otp_rental::db::{PgCatalog, PgOrderStore};
use otp_rental::ledger::PgLedger;
use otp_rental::notify::{LogOnlyReferral, TelegramNotifier};
use otp_rental::ports::{Catalog, Ledger, Notifier, OrderStore, ReferralHook, SmsProvider};
use otp_rental::provider::HeroSmsClient;
use otp_rental::{AppState, api, docs};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Arc::new(Config::from_env());

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let ledger: Arc<dyn Ledger> = Arc::new(PgLedger::new(pool.clone()));
    let orders: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(pool.clone()));
    let provider: Arc<dyn SmsProvider> = Arc::new(HeroSmsClient::new(
        config.provider_base_url.clone(),
        config.provider_api_key.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        config.telegram_api_base.clone(),
        config.bot_token.clone(),
    ));
    let referrals: Arc<dyn ReferralHook> = Arc::new(LogOnlyReferral {
        bonus: config.referral_bonus,
    });

    let coordinator = Arc::new(Coordinator::new(
        ledger.clone(),
        orders.clone(),
        catalog.clone(),
        provider.clone(),
        notifier.clone(),
        PollConfig {
            attempts: config.poll_attempts,
            interval: config.poll_interval,
            surcharge: config.price_surcharge,
        },
    ));

    let state = web::Data::new(AppState {
        pool,
        config: config.clone(),
        ledger,
        orders,
        catalog,
        provider,
        notifier,
        referrals,
        coordinator,
    });

    log::info!("listening on {}", config.bind_addr);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            .service(
                web::scope("/api")
                    .service(api::users::ensure_user)
                    .service(api::users::user_balance)
                    .service(api::users::create_wallet_request)
                    .service(api::catalog::list_services)
                    .service(api::catalog::list_servers)
                    .service(api::purchase::purchase_number)
                    .service(api::purchase::cancel_order)
                    .service(api::reports::recent_orders)
                    .service(api::reports::provider_balance),
            )
            .service(api::webhook::razorpay_webhook)
    })
    .bind(bind_addr)?
    .run()
    .await
}
