use sqlx::{PgPool, Postgres, Row, Transaction};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::domains::ledger::models::{Bucket, Transaction as LedgerTransaction, TransactionKind};

/// 원장에 추가할 새 거래
/// A new row to append to the ledger
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub counterparty_id: Option<Uuid>,
    pub bucket: Bucket,
    pub delta: i64,
    pub kind: TransactionKind,
    pub idempotency_key: Option<Uuid>,
    pub external_ref: Option<String>,
}

pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 거래 추가 (원자적 단위 내부에서만 호출)
    /// Append a transaction row (called inside the atomic unit only)
    ///
    /// 유니크 제약 위반(멱등 키 재생, external_ref 중복)은
    /// sqlx 에러 그대로 반환하여 호출자가 재생으로 해석하게 함.
    /// Unique violations (key replay, duplicate external_ref) are
    /// returned as raw sqlx errors so callers can classify replays.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: &NewTransaction,
    ) -> std::result::Result<u64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO coin_transactions
                (user_id, counterparty_id, bucket, delta, kind, idempotency_key, external_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(new.user_id)
        .bind(new.counterparty_id)
        .bind(new.bucket.as_str())
        .bind(new.delta)
        .bind(new.kind.as_str())
        .bind(new.idempotency_key)
        .bind(new.external_ref.as_deref())
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get::<i64, _>("id") as u64)
    }

    /// 사용자 거래 내역 조회 (최신순)
    /// List a user's transactions (newest first)
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<LedgerTransaction>> {
        // 제한 설정: 기본 50, 최대 1000
        // Limit: default 50, max 1000
        let limit = limit.unwrap_or(50).min(1000);

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, counterparty_id, bucket, delta, kind,
                   idempotency_key, external_ref, created_at
            FROM coin_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch transactions")?;

        rows.into_iter().map(map_row).collect()
    }

    /// 외부 결제 참조가 이미 원장에 있는지 확인
    /// Check whether an external payment ref is already in the ledger
    pub async fn exists_external_ref(&self, external_ref: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM coin_transactions WHERE external_ref = $1
            ) AS found
            "#,
        )
        .bind(external_ref)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check external ref")?;

        Ok(row.get("found"))
    }

    /// 버킷별 delta 합계 (원장 재구성 검증용)
    /// Sum of deltas per bucket (ledger reconstruction check)
    ///
    /// 불변식: 이 합계는 항상 accounts의 프로젝션과 일치해야 함.
    /// Invariant: must always match the accounts projection.
    pub async fn sum_by_bucket(&self, user_id: Uuid) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(delta) FILTER (WHERE bucket = 'paid'), 0)::BIGINT AS paid_sum,
                COALESCE(SUM(delta) FILTER (WHERE bucket = 'earned'), 0)::BIGINT AS earned_sum
            FROM coin_transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum transactions by bucket")?;

        Ok((row.get("paid_sum"), row.get("earned_sum")))
    }

    /// 사용자 거래 수 (재생 검증용)
    /// Count a user's transactions (replay checks)
    pub async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt FROM coin_transactions WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        Ok(row.get("cnt"))
    }
}

fn map_row(row: sqlx::postgres::PgRow) -> Result<LedgerTransaction> {
    let bucket_str: String = row.get("bucket");
    let kind_str: String = row.get("kind");

    Ok(LedgerTransaction {
        id: row.get::<i64, _>("id") as u64,
        user_id: row.get("user_id"),
        counterparty_id: row.get("counterparty_id"),
        bucket: Bucket::parse(&bucket_str)
            .ok_or_else(|| anyhow!("Unknown bucket in ledger: {bucket_str}"))?,
        delta: row.get("delta"),
        kind: TransactionKind::parse(&kind_str)
            .ok_or_else(|| anyhow!("Unknown kind in ledger: {kind_str}"))?,
        idempotency_key: row.get("idempotency_key"),
        external_ref: row.get("external_ref"),
        created_at: row.get("created_at"),
    })
}
