use sqlx::{PgPool, Row};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// 운영자 검토 큐 항목
/// Operator review queue entry
#[derive(Debug, Clone)]
pub struct ReconciliationRejection {
    pub id: u64,
    pub provider_order_id: String,
    pub reason: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct ReconciliationRejectionRepository {
    pool: PgPool,
}

impl ReconciliationRejectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 거부 이벤트 기록 (영구 불일치는 수동 해결 대상)
    /// Record a rejection (permanent mismatches need manual resolution)
    pub async fn insert(
        &self,
        provider_order_id: &str,
        reason: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reconciliation_rejections (provider_order_id, reason, detail, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(provider_order_id)
        .bind(reason)
        .bind(detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to insert reconciliation rejection")?;

        Ok(())
    }

    /// 최근 거부 목록 (운영자 화면용)
    /// Recent rejections (operator view)
    pub async fn list_recent(&self, limit: Option<i64>) -> Result<Vec<ReconciliationRejection>> {
        let limit = limit.unwrap_or(50).min(1000);

        let rows = sqlx::query(
            r#"
            SELECT id, provider_order_id, reason, detail, created_at
            FROM reconciliation_rejections
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reconciliation rejections")?;

        Ok(rows
            .into_iter()
            .map(|row| ReconciliationRejection {
                id: row.get::<i64, _>("id") as u64,
                provider_order_id: row.get("provider_order_id"),
                reason: row.get("reason"),
                detail: row.get("detail"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
