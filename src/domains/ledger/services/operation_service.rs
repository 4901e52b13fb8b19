use chrono::Utc;
use uuid::Uuid;

use crate::shared::database::{Database, PayoutRequestRepository, TransactionRepository};
use crate::shared::errors::LedgerError;
use crate::shared::utils::{derived_key, operation_fingerprint};
use crate::domains::ledger::models::{
    OperationRequest, OperationResponse, PayoutRequestBody, PayoutResponse, RewardRole,
    Transaction, TransactionKind,
};
use crate::domains::ledger::services::balance_service::{
    ApplyArgs, ApplyOutcome, BalanceService, TransferArgs, TransferOutcome,
};
use crate::domains::ledger::services::cashout::{eligible_tier, find_tier};
use crate::domains::ledger::services::idempotency_guard::{Admission, IdempotencyGuard};

/// 연산 서비스
/// Operation Service
///
/// 역할:
/// - 연산 API의 오케스트레이션: 가드 → 뮤테이터 → 결과 기록
/// - 현금화 요청 (티어 게이트 + paid 전용 차감)
/// - 일일 참여 리워드 (결정적 키 파생)
///
/// 특징:
/// - 같은 (키, 파라미터)의 재제출은 원래 성공 응답을 그대로 받음
/// - 실패한 연산은 키 예약을 해제하여 재시도 가능 상태로 남김
#[derive(Clone)]
pub struct OperationService {
    db: Database,
    guard: IdempotencyGuard,
    balances: BalanceService,
}

impl OperationService {
    pub fn new(db: Database) -> Self {
        Self {
            guard: IdempotencyGuard::new(db.clone()),
            balances: BalanceService::new(db.clone()),
            db,
        }
    }

    /// 연산 제출
    /// Submit an operation
    ///
    /// # Process
    /// 1. 종류/파라미터 검증 (선물 종류는 선물 큐로 돌려보냄)
    /// 2. 멱등성 가드 수용 판정
    /// 3. Fresh면 잔고 변경 실행, 결과 기록
    /// 4. Duplicate면 저장된 원래 응답 반환
    pub async fn submit(
        &self,
        req: &OperationRequest,
    ) -> Result<OperationResponse, LedgerError> {
        match req.kind {
            TransactionKind::GiftSend | TransactionKind::GiftReceive => {
                return Err(LedgerError::UnsupportedKind {
                    kind: req.kind.as_str().to_string(),
                });
            }
            _ => {}
        }

        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount: req.amount });
        }

        if let Some(counterparty) = req.counterparty_id {
            if counterparty == req.user_id {
                return Err(LedgerError::InvalidCounterparty);
            }
            // 상대방 크레딧은 수수료성 이전(spend)에서만 의미가 있음
            // A counterparty credit only makes sense for fee-style spends
            if req.kind != TransactionKind::Spend {
                return Err(LedgerError::InvalidCounterparty);
            }
        }

        let fingerprint = operation_fingerprint(
            req.user_id,
            req.kind.as_str(),
            req.amount,
            req.counterparty_id,
        );

        match self.guard.admit(req.idempotency_key, &fingerprint).await? {
            Admission::Duplicate(recorded) => Ok(OperationResponse {
                transaction_id: recorded.transaction_id,
                new_balance: recorded.new_balance,
                duplicate: true,
            }),
            Admission::Fresh => {
                let result = self.execute(req).await;

                match result {
                    Ok((transaction_id, new_balance)) => {
                        self.guard
                            .complete(req.idempotency_key, transaction_id, new_balance)
                            .await?;

                        Ok(OperationResponse {
                            transaction_id,
                            new_balance,
                            duplicate: false,
                        })
                    }
                    Err(err) => {
                        // 실패한 키는 해제: 같은 키로 재시도 가능해야 함
                        // Release the key so the caller may retry with it
                        let _ = self.guard.release(req.idempotency_key).await;
                        Err(err)
                    }
                }
            }
        }
    }

    /// 변경 실행 (가드 통과 후)
    /// Execute the mutation (after admission)
    async fn execute(&self, req: &OperationRequest) -> Result<(u64, i64), LedgerError> {
        // 프로필 열람 수수료 류: 차감과 상대방 earned 크레딧이 한 단위
        // Profile-view-fee style: debit plus counterparty earned credit in one unit
        if let (TransactionKind::Spend, Some(counterparty)) = (req.kind, req.counterparty_id) {
            let outcome = self
                .balances
                .transfer(&TransferArgs {
                    sender_id: req.user_id,
                    receiver_id: counterparty,
                    amount: req.amount,
                    debit_kind: TransactionKind::Spend,
                    credit_kind: TransactionKind::Reward,
                    debit_key: req.idempotency_key,
                    credit_key: req.idempotency_key,
                })
                .await?;

            return match outcome {
                TransferOutcome::Applied(applied) => {
                    Ok((applied.debit_transaction_id, applied.sender_total))
                }
                TransferOutcome::AlreadyApplied => Err(LedgerError::Database(
                    "ledger rows already recorded for a fresh key".to_string(),
                )),
            };
        }

        let outcome = self
            .balances
            .apply(&ApplyArgs {
                user_id: req.user_id,
                kind: req.kind,
                amount: req.amount,
                counterparty_id: req.counterparty_id,
                idempotency_key: Some(req.idempotency_key),
                external_ref: None,
            })
            .await?;

        match outcome {
            ApplyOutcome::Applied(applied) => Ok((applied.transaction_id, applied.total())),
            ApplyOutcome::AlreadyRecorded => Err(LedgerError::Database(
                "ledger rows already recorded for a fresh key".to_string(),
            )),
        }
    }

    /// 일일 참여 리워드 지급
    /// Grant the daily engagement reward
    ///
    /// 키를 날짜로부터 결정적으로 파생하므로 같은 날 재요청은
    /// 자동으로 Duplicate가 됨.
    /// The key derives deterministically from the date, so a same-day
    /// retry is automatically a duplicate.
    pub async fn grant_daily_reward(
        &self,
        user_id: Uuid,
        role: RewardRole,
    ) -> Result<OperationResponse, LedgerError> {
        let today = Utc::now().date_naive();
        let key = derived_key(&format!("daily:{}:{}:{}", role.as_str(), user_id, today));

        self.submit(&OperationRequest {
            idempotency_key: key,
            user_id,
            kind: TransactionKind::Reward,
            amount: role.daily_amount(),
            counterparty_id: None,
        })
        .await
    }

    /// 현금화 요청
    /// Request a payout
    ///
    /// # Process
    /// 1. 티어 조회, 총 잔고로 자격 판정
    /// 2. paid 버킷에서 티어 코인만큼 차감 (kind = payout)
    /// 3. 차감이 커밋된 뒤에만 운영용 payout_requests 행 기록
    ///
    /// 자격은 총 잔고 기준이지만 차감은 paid 전용이므로,
    /// 자격이 되어도 paid가 부족하면 InsufficientFunds로 거절됨.
    /// Eligibility uses the total balance while the debit is paid-only,
    /// so an eligible user can still be rejected with InsufficientFunds.
    pub async fn request_payout(
        &self,
        body: &PayoutRequestBody,
    ) -> Result<PayoutResponse, LedgerError> {
        let tier = find_tier(&body.tier_id).ok_or_else(|| LedgerError::UnknownTier {
            tier_id: body.tier_id.clone(),
        })?;

        let account = self.balances.get_account(body.user_id).await?;
        let total = account.total();

        let reaches_tier = eligible_tier(total)
            .map(|t| t.coins >= tier.coins)
            .unwrap_or(false);
        if !reaches_tier {
            return Err(LedgerError::TierNotEligible {
                tier_id: tier.id.to_string(),
                required: tier.coins,
                balance: total,
            });
        }

        let response = self
            .submit(&OperationRequest {
                idempotency_key: body.idempotency_key,
                user_id: body.user_id,
                kind: TransactionKind::Payout,
                amount: tier.coins,
                counterparty_id: None,
            })
            .await?;

        if !response.duplicate {
            let payouts = PayoutRequestRepository::new(self.db.pool().clone());
            payouts
                .insert(body.user_id, tier.id, tier.coins, tier.payout_usd())
                .await
                .map_err(LedgerError::database)?;
        }

        Ok(PayoutResponse {
            transaction_id: response.transaction_id,
            coins: tier.coins,
            usd_amount: tier.payout_usd(),
            new_balance: response.new_balance,
            duplicate: response.duplicate,
        })
    }

    /// 거래 내역 조회
    /// List a user's transactions
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let transactions = TransactionRepository::new(self.db.pool().clone());
        transactions
            .list_by_user(user_id, limit)
            .await
            .map_err(LedgerError::database)
    }
}
