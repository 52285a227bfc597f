// src/ledger.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::models::TxKind;
use crate::ports::{Ledger, StorageError};

/// Postgres-backed wallet ledger. Every balance mutation and its
/// transaction row commit together or not at all; the debit's funds check
/// happens inside the UPDATE itself, so concurrent purchases against one
/// wallet serialize at the database and can never overdraw.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn debit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let updated = sqlx::query(
            "UPDATE users SET balance = balance - $1 WHERE user_id = $2 AND balance >= $1",
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await.map_err(StorageError::from)?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO transactions (user_id, amount, type, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(amount)
        .bind(TxKind::Debit.as_str())
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(true)
    }

    async fn credit(&self, user_id: i64, amount: Decimal, reason: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let updated = sqlx::query("UPDATE users SET balance = balance + $1 WHERE user_id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?
            .rows_affected();

        // A transaction row without a matching balance mutation would break
        // the balance == sum(transactions) invariant.
        if updated == 0 {
            tx.rollback().await.map_err(StorageError::from)?;
            return Err(StorageError(format!("credit for unknown user {user_id}")));
        }

        sqlx::query(
            "INSERT INTO transactions (user_id, amount, type, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(amount)
        .bind(TxKind::Credit.as_str())
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> Result<Decimal, StorageError> {
        let row = sqlx::query("SELECT balance FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.get("balance")).unwrap_or(Decimal::ZERO))
    }
}
