// =====================================================
// SettlementProcessor - 선물 정산 배치 프로세서
// =====================================================
// 역할: pending_gifts 큐를 주기적으로 비워 정산된 원장 기록으로 전환
//
// 상태 머신 (PendingGift):
// pending -> settling -> { settled | failed }
// failed(재시도 가능) -> settling -> ... -> dead_letter
//
// 핵심 책임:
// 1. 만료된 settling 클레임 회수 (크래시 자가 치유)
// 2. FOR UPDATE SKIP LOCKED으로 배치 클레임 (이중 정산 방지)
// 3. 선물별 원자 정산: 보낸 쪽 차감 + 받는 쪽 크레딧, 전부 아니면 전무
// 4. 사이클당 BatchRun 한 건 기록 (백로그 관측)
//
// 안전성:
// - 정산 레그의 멱등 키는 선물 ID에서 결정적으로 파생
//   → 재실행된 사이클은 이미 정산된 선물에 아무 기록도 추가하지 않음
// - 한 선물의 실패는 같은 사이클의 다른 선물을 막지 않음
// - 같은 사이클 내 같은 보낸 사람의 선물은 제출 순서대로 적용
//   → 잔고가 아슬아슬한 경우에도 결과가 결정적
// =====================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::shared::database::{BatchRunRepository, Database, PendingGiftRepository};
use crate::shared::errors::LedgerError;
use crate::shared::utils::derived_key;
use crate::domains::gifts::models::{BatchRun, PendingGift};
use crate::domains::ledger::models::TransactionKind;
use crate::domains::ledger::services::balance_service::{
    BalanceService, TransferArgs, TransferOutcome,
};

/// 선물당 최대 정산 시도 횟수 (이후 dead_letter)
/// Max settlement attempts per gift (dead_letter afterwards)
pub const MAX_ATTEMPTS: i32 = 5;

/// 재시도 백오프 (지수, 상한 5분)
/// Retry backoff (exponential, capped at 5 minutes)
pub fn retry_backoff(attempts: i32) -> ChronoDuration {
    let exp = (attempts - 1).clamp(0, 16) as u32;
    let secs = 2i64.saturating_mul(1i64 << exp).min(300);
    ChronoDuration::seconds(secs)
}

#[derive(Clone)]
pub struct SettlementProcessor {
    db: Database,
    balances: BalanceService,

    /// 배치당 최대 클레임 건수
    /// Max gifts claimed per cycle
    batch_size: i64,

    /// settling 클레임 만료 시간
    /// Claim expiry window
    claim_expiry: ChronoDuration,

    /// 사이클 중복 실행 방지 (프로세스 내)
    /// In-process cycle overlap guard
    running: Arc<AtomicBool>,

    /// 스케줄러 활성화 상태
    /// Scheduler enable flag
    enabled: Arc<AtomicBool>,
}

impl SettlementProcessor {
    pub fn new(db: Database, batch_size: i64, claim_expiry: std::time::Duration) -> Self {
        Self {
            balances: BalanceService::new(db.clone()),
            db,
            batch_size,
            claim_expiry: ChronoDuration::from_std(claim_expiry)
                .unwrap_or_else(|_| ChronoDuration::seconds(60)),
            running: Arc::new(AtomicBool::new(false)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 스케줄러 시작
    /// Start the scheduler
    ///
    /// 고정 주기로 사이클을 실행하는 백그라운드 태스크를 띄웁니다.
    /// 이전 사이클이 끝나지 않았으면 이번 틱은 건너뜁니다.
    /// Spawns a background task running cycles on a fixed interval;
    /// a tick is skipped while the previous cycle is still running.
    pub fn start(&self, every: Duration) {
        let processor = self.clone();

        tokio::spawn(async move {
            let mut interval = interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !processor.enabled.load(Ordering::Relaxed) {
                    continue;
                }

                // 재진입 가드: 두 사이클이 겹치지 않음
                // Reentrancy guard: cycles never overlap
                if processor
                    .running
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    continue;
                }

                if let Err(e) = processor.run_cycle(processor.batch_size).await {
                    tracing::error!(error = %e, "settlement cycle failed");
                }

                processor.running.store(false, Ordering::Release);
            }
        });
    }

    /// 한 사이클 실행
    /// Run one cycle
    ///
    /// # Process
    /// 1. 만료 클레임 회수
    /// 2. 최대 max_batch건 클레임 (가장 오래된 것부터)
    /// 3. 선물별 정산 (실패 격리)
    /// 4. BatchRun 기록
    pub async fn run_cycle(&self, max_batch: i64) -> Result<BatchRun> {
        let started = Instant::now();
        let run_at = Utc::now();

        let gifts_repo = PendingGiftRepository::new(self.db.pool().clone());
        let runs_repo = BatchRunRepository::new(self.db.pool().clone());

        // 크래시한 인스턴스의 클레임 회수
        // Reclaim claims left behind by a crashed instance
        let reclaimed = gifts_repo.reclaim_expired(self.claim_expiry).await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "reclaimed expired settlement claims");
        }

        let claim_token = Uuid::new_v4();
        let claimed = gifts_repo
            .claim(max_batch, claim_token, MAX_ATTEMPTS)
            .await?;

        let processed_count = claimed.len() as i32;
        let mut error_count = 0i32;

        for gift in &claimed {
            if let Err(reason) = self.settle_one(&gifts_repo, gift).await {
                error_count += 1;
                tracing::warn!(
                    gift_id = gift.id,
                    sender = %gift.sender_id,
                    reason = %reason,
                    "gift settlement failed"
                );
            }
        }

        let backlog_count = gifts_repo.pending_count().await?;
        let duration_ms = started.elapsed().as_millis() as i64;

        let run = runs_repo
            .insert(run_at, processed_count, backlog_count, duration_ms, error_count)
            .await?;

        tracing::info!(
            processed = processed_count,
            errors = error_count,
            backlog = backlog_count,
            duration_ms,
            "settlement cycle complete"
        );

        Ok(run)
    }

    /// 선물 하나 정산
    /// Settle one gift
    ///
    /// 성공/재생이면 settled, 실패면 에러 사유를 반환하고
    /// 상태 전이는 내부에서 처리합니다.
    /// Returns the failure reason on error; state transitions are
    /// handled internally either way.
    async fn settle_one(
        &self,
        repo: &PendingGiftRepository,
        gift: &PendingGift,
    ) -> std::result::Result<(), String> {
        let debit_key = derived_key(&format!("gift:{}:debit", gift.id));
        let credit_key = derived_key(&format!("gift:{}:credit", gift.id));

        let result = self
            .balances
            .transfer(&TransferArgs {
                sender_id: gift.sender_id,
                receiver_id: gift.receiver_id,
                amount: gift.total_cost(),
                debit_kind: TransactionKind::GiftSend,
                credit_kind: TransactionKind::GiftReceive,
                debit_key,
                credit_key,
            })
            .await;

        match result {
            // 정산 완료, 또는 이전 사이클이 이미 정산함 (크래시 후 재스캔)
            // Settled now, or a previous cycle already did (post-crash re-scan)
            Ok(TransferOutcome::Applied(_)) | Ok(TransferOutcome::AlreadyApplied) => {
                if let Err(e) = repo.mark_settled(gift.id).await {
                    return Err(format!("settled but status update failed: {e:#}"));
                }
                Ok(())
            }

            // 불변식 위반은 영구 실패: 수신자 크레딧 없음, 자동 재시도 없음
            // Invariant violations are terminal: no credit, no auto-retry
            Err(LedgerError::InsufficientFunds { required, available }) => {
                let reason = format!("insufficient_funds: required={required}, available={available}");
                let _ = repo.mark_failed_terminal(gift.id, &reason).await;
                Err(reason)
            }

            // 인프라 오류는 백오프 후 재시도, 시도 소진 시 dead_letter
            // Infrastructure errors retry with backoff, then dead_letter
            Err(err) => {
                let attempts = gift.attempts + 1;
                let reason = err.to_string();

                if attempts >= MAX_ATTEMPTS {
                    let _ = repo.mark_dead_letter(gift.id, &reason, attempts).await;
                } else {
                    let next_attempt_at = Utc::now() + retry_backoff(attempts);
                    let _ = repo
                        .mark_failed_retry(gift.id, &reason, attempts, next_attempt_at)
                        .await;
                }
                Err(reason)
            }
        }
    }

    /// 스케줄러 활성화
    /// Enable the scheduler
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// 스케줄러 비활성화
    /// Disable the scheduler
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// 스케줄러 상태 조회
    /// Get scheduler status
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_exponential() {
        assert_eq!(retry_backoff(1), ChronoDuration::seconds(2));
        assert_eq!(retry_backoff(2), ChronoDuration::seconds(4));
        assert_eq!(retry_backoff(3), ChronoDuration::seconds(8));
        assert_eq!(retry_backoff(4), ChronoDuration::seconds(16));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(retry_backoff(10), ChronoDuration::seconds(300));
        assert_eq!(retry_backoff(100), ChronoDuration::seconds(300));
    }

    #[test]
    fn test_backoff_handles_degenerate_attempts() {
        assert_eq!(retry_backoff(0), ChronoDuration::seconds(2));
        assert_eq!(retry_backoff(-3), ChronoDuration::seconds(2));
    }
}
