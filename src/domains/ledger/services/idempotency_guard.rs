// =====================================================
// IdempotencyGuard - 중복 연산 차단
// =====================================================
// 역할: 논리적으로 동일한 연산의 재제출을 탐지 (클라이언트 재시도, 웹훅 재전송)
//
// 계약: admit(key, fingerprint) -> Fresh | Duplicate(이전 결과)
//
// 동작:
// 1. 첫 제출: unique insert로 키를 원자적으로 예약하고 Fresh 반환
// 2. 재제출: 저장된 결과를 Duplicate로 반환 (부작용 없음)
// 3. 같은 키 + 다른 파라미터: IdempotencyConflict (fail closed)
//
// 경쟁 조건:
// 같은 새 키의 동시 제출은 정확히 하나만 Fresh.
// 패자는 승자가 결과를 기록할 때까지 짧은 백오프로 대기 후 Duplicate.
// Exactly one Fresh winner under concurrency; the loser polls with
// short backoff until the winner records its result, then sees Duplicate.
// =====================================================

use rand::Rng;
use std::time::Duration;
use uuid::Uuid;

use crate::shared::database::{Database, IdempotencyRepository};
use crate::shared::errors::LedgerError;

/// 패자 대기 한도 (재시도 횟수)
/// Loser wait budget (poll attempts)
const WAIT_ATTEMPTS: u32 = 20;

/// 패자 대기 기본 간격
/// Base poll interval for the loser
const WAIT_BASE: Duration = Duration::from_millis(15);

/// 수용 결과
/// Admission outcome
#[derive(Debug)]
pub enum Admission {
    /// 처음 보는 연산: 호출자가 진행하고 완료 시 결과를 기록해야 함
    /// First admission: the caller proceeds and records the result
    Fresh,
    /// 이미 처리된 연산: 원래 결과를 그대로 반환
    /// Already processed: the original result is returned
    Duplicate(RecordedResult),
}

/// 기록된 원래 결과
/// The recorded original result
#[derive(Debug, Clone, Copy)]
pub struct RecordedResult {
    pub transaction_id: u64,
    pub new_balance: i64,
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    db: Database,
}

impl IdempotencyGuard {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 연산 수용 판정
    /// Admit an operation
    ///
    /// # Arguments
    /// * `key` - 호출자 제공 멱등성 키 (논리적 의도당 하나)
    /// * `fingerprint` - 의미 파라미터의 해시
    ///
    /// # Errors
    /// * `IdempotencyConflict` - 같은 키가 다른 파라미터로 재사용됨
    /// * `OperationInFlight` - 승자가 대기 한도 내에 결과를 기록하지 않음
    pub async fn admit(&self, key: Uuid, fingerprint: &str) -> Result<Admission, LedgerError> {
        let repo = IdempotencyRepository::new(self.db.pool().clone());

        if repo
            .try_reserve(key, fingerprint)
            .await
            .map_err(LedgerError::database)?
        {
            return Ok(Admission::Fresh);
        }

        // 예약 실패: 기존 레코드 확인
        // Reservation lost: inspect the existing record
        for attempt in 0..WAIT_ATTEMPTS {
            let record = repo
                .find(key)
                .await
                .map_err(LedgerError::database)?;

            match record {
                Some(record) => {
                    if record.fingerprint != fingerprint {
                        return Err(LedgerError::IdempotencyConflict { key });
                    }

                    if record.completed {
                        let (Some(transaction_id), Some(new_balance)) =
                            (record.transaction_id, record.new_balance)
                        else {
                            return Err(LedgerError::Database(
                                "completed idempotency record without result".to_string(),
                            ));
                        };

                        return Ok(Admission::Duplicate(RecordedResult {
                            transaction_id,
                            new_balance,
                        }));
                    }
                }
                // 승자가 실패하여 예약을 해제한 경우: 이번 제출이 새 승자가 됨
                // The winner failed and released: this submission becomes the winner
                None => {
                    if repo
                        .try_reserve(key, fingerprint)
                        .await
                        .map_err(LedgerError::database)?
                    {
                        return Ok(Admission::Fresh);
                    }
                    continue;
                }
            }

            // 승자가 아직 진행 중: 지터를 더한 백오프 후 재확인
            // Winner still in flight: back off with jitter and re-check
            let jitter = rand::thread_rng().gen_range(0..10);
            let delay = WAIT_BASE * (attempt + 1) + Duration::from_millis(jitter);
            tokio::time::sleep(delay).await;
        }

        Err(LedgerError::OperationInFlight { key })
    }

    /// 승자의 결과 기록 (이후 재제출은 이 결과를 받음)
    /// Record the winner's result (replays observe this payload)
    pub async fn complete(
        &self,
        key: Uuid,
        transaction_id: u64,
        new_balance: i64,
    ) -> Result<(), LedgerError> {
        let repo = IdempotencyRepository::new(self.db.pool().clone());
        repo.complete(key, transaction_id, new_balance)
            .await
            .map_err(LedgerError::database)
    }

    /// 실패한 연산의 예약 해제 (같은 키로 재시도 가능해야 함)
    /// Release a failed operation's reservation (the key stays retryable)
    pub async fn release(&self, key: Uuid) -> Result<(), LedgerError> {
        let repo = IdempotencyRepository::new(self.db.pool().clone());
        repo.release(key).await.map_err(LedgerError::database)
    }
}
