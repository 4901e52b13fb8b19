use sqlx::{PgPool, Row};
use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domains::payments::models::{CoinOrder, OrderStatus};

pub struct CoinOrderRepository {
    pool: PgPool,
}

impl CoinOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 로컬 주문 기록 생성
    /// Create the local order record
    pub async fn insert(
        &self,
        user_id: Uuid,
        package_id: &str,
        coins: i64,
        usd_amount: Decimal,
    ) -> Result<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO coin_orders (user_id, package_id, coins, usd_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'created', $5, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(package_id)
        .bind(coins)
        .bind(usd_amount)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert coin order")?;

        Ok(row.get::<i64, _>("id") as u64)
    }

    /// 프로바이더 주문 ID 연결
    /// Attach the provider order id
    pub async fn set_provider_order(&self, id: u64, provider_order_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE coin_orders
            SET provider_order_id = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(provider_order_id)
        .bind(Utc::now())
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to set provider order id")?;

        Ok(())
    }

    /// 프로바이더 주문 ID로 조회
    /// Find by provider order id
    pub async fn find_by_provider_order(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<CoinOrder>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, package_id, coins, usd_amount, provider_order_id,
                   status, created_at, updated_at
            FROM coin_orders
            WHERE provider_order_id = $1
            "#,
        )
        .bind(provider_order_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch coin order")?;

        row.map(map_row).transpose()
    }

    /// 상태 변경
    /// Update status
    pub async fn set_status(&self, id: u64, status: OrderStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE coin_orders
            SET status = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to update coin order status")?;

        Ok(())
    }

    /// 오래된 미완결 주문 조회 (재조정 스윕 대상)
    /// List stale unresolved orders (reconciliation sweep targets)
    pub async fn list_stale_created(
        &self,
        older_than: ChronoDuration,
        limit: i64,
    ) -> Result<Vec<CoinOrder>> {
        let cutoff = Utc::now() - older_than;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, package_id, coins, usd_amount, provider_order_id,
                   status, created_at, updated_at
            FROM coin_orders
            WHERE status = 'created' AND provider_order_id IS NOT NULL AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list stale coin orders")?;

        rows.into_iter().map(map_row).collect()
    }
}

fn map_row(row: sqlx::postgres::PgRow) -> Result<CoinOrder> {
    let status_str: String = row.get("status");

    Ok(CoinOrder {
        id: row.get::<i64, _>("id") as u64,
        user_id: row.get("user_id"),
        package_id: row.get("package_id"),
        coins: row.get("coins"),
        usd_amount: row.get("usd_amount"),
        provider_order_id: row.get("provider_order_id"),
        status: OrderStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("Unknown order status: {status_str}"))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
