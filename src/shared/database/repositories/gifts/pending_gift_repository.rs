use sqlx::{PgPool, Row};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::domains::gifts::models::{GiftStatus, PendingGift};

/// 접수할 새 선물
/// A new gift to enqueue
#[derive(Debug, Clone)]
pub struct NewPendingGift {
    pub idempotency_key: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub gift_code: String,
    pub unit_cost: i64,
    pub quantity: i32,
}

pub struct PendingGiftRepository {
    pool: PgPool,
}

impl PendingGiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 선물 접수 (pending으로 삽입, 키 dedup)
    /// Enqueue a gift (insert as pending, deduped by key)
    ///
    /// # Returns
    /// (큐 레코드 ID, 새로 삽입됐는지 여부)
    /// (queue record id, whether this call inserted it)
    pub async fn insert(&self, new: &NewPendingGift) -> Result<(u64, bool)> {
        let row = sqlx::query(
            r#"
            INSERT INTO pending_gifts
                (idempotency_key, sender_id, receiver_id, gift_code, unit_cost, quantity, status, submitted_at, next_attempt_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(new.idempotency_key)
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(&new.gift_code)
        .bind(new.unit_cost)
        .bind(new.quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to enqueue pending gift")?;

        if let Some(row) = row {
            return Ok((row.get::<i64, _>("id") as u64, true));
        }

        // 같은 키의 기존 접수 반환 (재시도된 제출)
        // Return the existing submission for this key (retried submit)
        let row = sqlx::query(
            r#"
            SELECT id FROM pending_gifts WHERE idempotency_key = $1
            "#,
        )
        .bind(new.idempotency_key)
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch deduped pending gift")?;

        Ok((row.get::<i64, _>("id") as u64, false))
    }

    /// 키로 접수 레코드 조회 (fingerprint 충돌 검사용)
    /// Fetch a submission by key (fingerprint conflict check)
    pub async fn get_by_key(&self, key: Uuid) -> Result<Option<PendingGift>> {
        let row = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, gift_code, unit_cost, quantity,
                   status, attempts, fail_reason, submitted_at, settled_at
            FROM pending_gifts
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch pending gift by key")?;

        row.map(map_row).transpose()
    }

    /// 선물 조회
    /// Get a gift by id
    pub async fn get(&self, id: u64) -> Result<Option<PendingGift>> {
        let row = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, gift_code, unit_cost, quantity,
                   status, attempts, fail_reason, submitted_at, settled_at
            FROM pending_gifts
            WHERE id = $1
            "#,
        )
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch pending gift")?;

        row.map(map_row).transpose()
    }

    /// 만료된 settling 클레임 회수
    /// Reclaim expired settling claims
    ///
    /// 크래시한 인스턴스가 잡아둔 행을 pending으로 되돌려
    /// 다음 사이클이 다시 집을 수 있게 함.
    /// Returns rows grabbed by a crashed instance to pending so a
    /// later cycle can pick them up.
    pub async fn reclaim_expired(&self, expiry: ChronoDuration) -> Result<u64> {
        let cutoff = Utc::now() - expiry;

        let result = sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'pending', claim_token = NULL, claimed_at = NULL
            WHERE status = 'settling' AND claimed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to reclaim expired claims")?;

        Ok(result.rows_affected())
    }

    /// 배치 클레임
    /// Claim a batch
    ///
    /// 가장 오래된 처리 대상부터 최대 batch_size건을 settling으로 전환.
    /// FOR UPDATE SKIP LOCKED으로 동시 사이클이 같은 행을 못 집게 함.
    /// Claims up to batch_size oldest eligible rows as settling.
    /// FOR UPDATE SKIP LOCKED keeps concurrent cycles off the same rows.
    pub async fn claim(
        &self,
        batch_size: i64,
        claim_token: Uuid,
        max_attempts: i32,
    ) -> Result<Vec<PendingGift>> {
        let rows = sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'settling', claim_token = $1, claimed_at = $2
            WHERE id IN (
                SELECT id FROM pending_gifts
                WHERE status IN ('pending', 'failed')
                  AND next_attempt_at IS NOT NULL
                  AND next_attempt_at <= $2
                  AND attempts < $3
                ORDER BY submitted_at ASC, id ASC
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, sender_id, receiver_id, gift_code, unit_cost, quantity,
                      status, attempts, fail_reason, submitted_at, settled_at
            "#,
        )
        .bind(claim_token)
        .bind(Utc::now())
        .bind(max_attempts)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .context("Failed to claim pending gifts")?;

        let mut gifts: Vec<PendingGift> = rows
            .into_iter()
            .map(map_row)
            .collect::<Result<Vec<_>>>()?;

        // RETURNING은 순서를 보장하지 않으므로 제출 순서로 재정렬
        // RETURNING has no ordering guarantee; re-sort by submission order
        gifts.sort_by(|a, b| (a.submitted_at, a.id).cmp(&(b.submitted_at, b.id)));

        Ok(gifts)
    }

    /// 정산 완료 표시
    /// Mark settled
    pub async fn mark_settled(&self, id: u64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'settled', settled_at = $1, claim_token = NULL, claimed_at = NULL,
                fail_reason = NULL, next_attempt_at = NULL
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to mark gift settled")?;

        Ok(())
    }

    /// 영구 실패 표시 (재시도 없음: 잔고 부족 등 불변식 위반)
    /// Mark terminally failed (no retry: invariant violations)
    pub async fn mark_failed_terminal(&self, id: u64, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'failed', fail_reason = $1, claim_token = NULL, claimed_at = NULL,
                next_attempt_at = NULL
            WHERE id = $2
            "#,
        )
        .bind(reason)
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to mark gift failed")?;

        Ok(())
    }

    /// 재시도 가능 실패 표시 (백오프 후 재클레임 대상)
    /// Mark retryably failed (re-claimable after backoff)
    pub async fn mark_failed_retry(
        &self,
        id: u64,
        reason: &str,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'failed', fail_reason = $1, attempts = $2, next_attempt_at = $3,
                claim_token = NULL, claimed_at = NULL
            WHERE id = $4
            "#,
        )
        .bind(reason)
        .bind(attempts)
        .bind(next_attempt_at)
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to mark gift for retry")?;

        Ok(())
    }

    /// 데드레터 표시 (시도 소진, 수동 검토)
    /// Mark dead-lettered (retry budget exhausted, manual review)
    pub async fn mark_dead_letter(&self, id: u64, reason: &str, attempts: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pending_gifts
            SET status = 'dead_letter', fail_reason = $1, attempts = $2,
                claim_token = NULL, claimed_at = NULL, next_attempt_at = NULL
            WHERE id = $3
            "#,
        )
        .bind(reason)
        .bind(attempts)
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .context("Failed to dead-letter gift")?;

        Ok(())
    }

    /// 남은 pending 건수 (백로그)
    /// Remaining pending count (backlog)
    pub async fn pending_count(&self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt FROM pending_gifts WHERE status = 'pending'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count backlog")?;

        Ok(row.get("cnt"))
    }
}

fn map_row(row: sqlx::postgres::PgRow) -> Result<PendingGift> {
    let status_str: String = row.get("status");

    Ok(PendingGift {
        id: row.get::<i64, _>("id") as u64,
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        gift_code: row.get("gift_code"),
        unit_cost: row.get("unit_cost"),
        quantity: row.get("quantity"),
        status: GiftStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("Unknown gift status: {status_str}"))?,
        attempts: row.get("attempts"),
        fail_reason: row.get("fail_reason"),
        submitted_at: row.get("submitted_at"),
        settled_at: row.get("settled_at"),
    })
}
