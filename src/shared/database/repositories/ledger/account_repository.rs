use sqlx::{PgPool, Postgres, Row, Transaction};
use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::domains::ledger::models::Account;

pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 계정 조회
    /// Get account by user ID
    pub async fn get(&self, user_id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, paid_balance, earned_balance, created_at, updated_at
            FROM accounts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        Ok(row.map(|row| Account {
            user_id: row.get("user_id"),
            paid_balance: row.get("paid_balance"),
            earned_balance: row.get("earned_balance"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// 계정 lazy 생성 (첫 연산 시)
    /// Lazily create the account row (first operation)
    pub async fn ensure_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, paid_balance, earned_balance, created_at, updated_at)
            VALUES ($1, 0, 0, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .context("Failed to ensure account exists")?;

        Ok(())
    }

    /// 쓰기 잠금과 함께 계정 조회
    /// Fetch the account row under a write lock
    ///
    /// 같은 사용자의 변경을 직렬화하는 유일한 지점.
    /// 다른 사용자 행은 잠기지 않으므로 사용자 간 병렬성은 제한 없음.
    /// The single point serializing mutations for one user; rows of
    /// other users stay unlocked.
    pub async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Account> {
        let row = sqlx::query(
            r#"
            SELECT user_id, paid_balance, earned_balance, created_at, updated_at
            FROM accounts
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to lock account row")?;

        Ok(Account {
            user_id: row.get("user_id"),
            paid_balance: row.get("paid_balance"),
            earned_balance: row.get("earned_balance"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// 잠긴 행의 잔고 갱신
    /// Update balances on the locked row
    pub async fn update_balances(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        paid_balance: i64,
        earned_balance: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET paid_balance = $1, earned_balance = $2, updated_at = $3
            WHERE user_id = $4
            "#,
        )
        .bind(paid_balance)
        .bind(earned_balance)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .context("Failed to update account balances")?;

        Ok(())
    }
}
