use sqlx::{PgPool, Row};
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct PayoutRequestRepository {
    pool: PgPool,
}

impl PayoutRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 현금화 요청 기록 (paid 차감 커밋 이후에만 호출)
    /// Record a payout request (only after the paid debit committed)
    pub async fn insert(
        &self,
        user_id: Uuid,
        tier_id: &str,
        coins: i64,
        usd_amount: Decimal,
    ) -> Result<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO payout_requests (user_id, tier_id, coins, usd_amount, status, created_at)
            VALUES ($1, $2, $3, $4, 'requested', $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(tier_id)
        .bind(coins)
        .bind(usd_amount)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert payout request")?;

        Ok(row.get::<i64, _>("id") as u64)
    }
}
