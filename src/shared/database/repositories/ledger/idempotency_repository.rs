use sqlx::{PgPool, Row};
use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

/// 멱등성 키 레코드
/// Idempotency key record
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub key: Uuid,
    pub fingerprint: String,
    pub completed: bool,
    pub transaction_id: Option<u64>,
    pub new_balance: Option<i64>,
}

pub struct IdempotencyRepository {
    pool: PgPool,
}

impl IdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 키 예약 시도 (unique insert)
    /// Try to reserve a key (unique insert)
    ///
    /// 동시 제출 중 정확히 하나만 true를 받음.
    /// Exactly one of concurrent submitters gets true.
    pub async fn try_reserve(&self, key: Uuid, fingerprint: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, fingerprint, status, created_at)
            VALUES ($1, $2, 'pending', $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(fingerprint)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to reserve idempotency key")?;

        Ok(result.rows_affected() == 1)
    }

    /// 키 레코드 조회
    /// Fetch a key record
    pub async fn find(&self, key: Uuid) -> Result<Option<IdempotencyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT key, fingerprint, status, transaction_id, new_balance
            FROM idempotency_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch idempotency key")?;

        Ok(row.map(|row| {
            let status: String = row.get("status");
            IdempotencyRecord {
                key: row.get("key"),
                fingerprint: row.get("fingerprint"),
                completed: status == "completed",
                transaction_id: row
                    .get::<Option<i64>, _>("transaction_id")
                    .map(|id| id as u64),
                new_balance: row.get("new_balance"),
            }
        }))
    }

    /// 결과 기록 (승자가 연산 완료 후 호출)
    /// Record the result (winner calls after completing the operation)
    pub async fn complete(
        &self,
        key: Uuid,
        transaction_id: u64,
        new_balance: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET status = 'completed', transaction_id = $1, new_balance = $2, completed_at = $3
            WHERE key = $4
            "#,
        )
        .bind(transaction_id as i64)
        .bind(new_balance)
        .bind(Utc::now())
        .bind(key)
        .execute(&self.pool)
        .await
        .context("Failed to complete idempotency key")?;

        Ok(())
    }

    /// 예약 해제 (연산이 실패하면 같은 키로 재시도 가능해야 함)
    /// Release a reservation (a failed operation must stay retryable)
    pub async fn release(&self, key: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE key = $1 AND status = 'pending'
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .context("Failed to release idempotency key")?;

        Ok(())
    }
}
