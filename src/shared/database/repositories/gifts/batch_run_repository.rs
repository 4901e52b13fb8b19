use sqlx::{PgPool, Row};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::domains::gifts::models::BatchRun;

pub struct BatchRunRepository {
    pool: PgPool,
}

impl BatchRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 사이클 기록 삽입 (생성 후 읽기 전용)
    /// Insert a cycle record (read-only after creation)
    pub async fn insert(
        &self,
        run_at: DateTime<Utc>,
        processed_count: i32,
        backlog_count: i64,
        duration_ms: i64,
        error_count: i32,
    ) -> Result<BatchRun> {
        let row = sqlx::query(
            r#"
            INSERT INTO batch_runs (run_at, processed_count, backlog_count, duration_ms, error_count)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(run_at)
        .bind(processed_count)
        .bind(backlog_count)
        .bind(duration_ms)
        .bind(error_count)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert batch run")?;

        Ok(BatchRun {
            id: row.get::<i64, _>("id") as u64,
            run_at,
            processed_count,
            backlog_count,
            duration_ms,
            error_count,
        })
    }

    /// 최근 사이클 기록 조회 (최신순)
    /// List recent cycle records (newest first)
    pub async fn list_recent(&self, limit: Option<i64>) -> Result<Vec<BatchRun>> {
        let limit = limit.unwrap_or(50).min(1000);

        let rows = sqlx::query(
            r#"
            SELECT id, run_at, processed_count, backlog_count, duration_ms, error_count
            FROM batch_runs
            ORDER BY run_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch batch runs")?;

        Ok(rows
            .into_iter()
            .map(|row| BatchRun {
                id: row.get::<i64, _>("id") as u64,
                run_at: row.get("run_at"),
                processed_count: row.get("processed_count"),
                backlog_count: row.get("backlog_count"),
                duration_ms: row.get("duration_ms"),
                error_count: row.get("error_count"),
            })
            .collect())
    }
}
