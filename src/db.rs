// src/db.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{NewOrder, Order, OrderStatus, ServerTier, Service};
use crate::ports::{Catalog, OrderStore, StorageError};

fn order_from_row(row: &PgRow) -> Result<Order, StorageError> {
    let status: String = row.get("status");
    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        service_id: row.get("service_id"),
        server_id: row.get("server_id"),
        phone_number: row.get("phone_number"),
        activation_id: row.get("activation_id"),
        status: status.parse().map_err(StorageError)?,
        otp: row.get("otp"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn service_from_row(row: &PgRow) -> Service {
    Service {
        id: row.get("id"),
        service_name: row.get("service_name"),
        provider_service_code: row.get("provider_service_code"),
        country_id: row.get("country_id"),
        is_active: row.get("is_active"),
    }
}

fn server_from_row(row: &PgRow) -> ServerTier {
    ServerTier {
        id: row.get("id"),
        service_id: row.get("service_id"),
        server_number: row.get("server_number"),
        price: row.get("price"),
        is_active: row.get("is_active"),
    }
}

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn is_user_blocked(&self, user_id: i64) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT is_blocked FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.get("is_blocked")).unwrap_or(false))
    }

    async fn referred_by(&self, user_id: i64) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query("SELECT referred_by FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.and_then(|r| r.get("referred_by")))
    }

    async fn service(&self, service_id: i32) -> Result<Option<Service>, StorageError> {
        let row = sqlx::query(
            r#"SELECT id, service_name, provider_service_code, country_id, is_active
               FROM services
               WHERE id = $1"#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(|r| service_from_row(&r)))
    }

    async fn server(&self, server_id: i32) -> Result<Option<ServerTier>, StorageError> {
        let row = sqlx::query(
            r#"SELECT id, service_id, server_number, price, is_active
               FROM servers
               WHERE id = $1"#,
        )
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(|r| server_from_row(&r)))
    }
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> Result<i64, StorageError> {
        let row = sqlx::query(
            r#"INSERT INTO orders (user_id, service_id, server_id, phone_number, activation_id, status)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(order.user_id)
        .bind(order.service_id)
        .bind(order.server_id)
        .bind(&order.phone_number)
        .bind(&order.activation_id)
        .bind(order.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.get("id"))
    }

    async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        otp: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"UPDATE orders
               SET status = $1, otp = COALESCE($2, otp), updated_at = now()
               WHERE id = $3"#,
        )
        .bind(status.as_str())
        .bind(otp)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn get(&self, order_id: i64) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, service_id, server_id, phone_number, activation_id,
                      status, otp, created_at, updated_at
               FROM orders
               WHERE id = $1"#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Order>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, service_id, server_id, phone_number, activation_id,
                      status, otp, created_at, updated_at
               FROM orders
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        rows.iter().map(order_from_row).collect()
    }
}

/// Creates the user row on first contact; later contacts are no-ops, so
/// the referrer recorded on the first one sticks.
pub async fn ensure_user(
    pool: &PgPool,
    user_id: i64,
    referred_by: Option<i64>,
) -> Result<(), StorageError> {
    sqlx::query("INSERT INTO users (user_id, referred_by) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .bind(referred_by)
        .execute(pool)
        .await
        .map_err(StorageError::from)?;

    Ok(())
}

pub async fn active_services(pool: &PgPool) -> Result<Vec<Service>, StorageError> {
    let rows = sqlx::query(
        r#"SELECT id, service_name, provider_service_code, country_id, is_active
           FROM services
           WHERE is_active = TRUE
           ORDER BY service_name"#,
    )
    .fetch_all(pool)
    .await
    .map_err(StorageError::from)?;

    Ok(rows.iter().map(service_from_row).collect())
}

pub async fn active_servers(pool: &PgPool, service_id: i32) -> Result<Vec<ServerTier>, StorageError> {
    let rows = sqlx::query(
        r#"SELECT id, service_id, server_number, price, is_active
           FROM servers
           WHERE service_id = $1 AND is_active = TRUE
           ORDER BY server_number"#,
    )
    .bind(service_id)
    .fetch_all(pool)
    .await
    .map_err(StorageError::from)?;

    Ok(rows.iter().map(server_from_row).collect())
}

pub async fn create_wallet_request(
    pool: &PgPool,
    user_id: i64,
    amount: Decimal,
    screenshot_url: Option<&str>,
) -> Result<i32, StorageError> {
    let row = sqlx::query(
        r#"INSERT INTO wallet_requests (user_id, amount, screenshot_url)
           VALUES ($1, $2, $3)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(screenshot_url)
    .fetch_one(pool)
    .await
    .map_err(StorageError::from)?;

    Ok(row.get("id"))
}
