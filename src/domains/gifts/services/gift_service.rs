use crate::shared::database::{Database, NewPendingGift, PendingGiftRepository};
use crate::shared::errors::LedgerError;
use crate::domains::gifts::models::{find_gift, GiftRequest, PendingGift};
use crate::domains::ledger::services::BalanceService;

/// 선물 서비스
/// Gift Service
///
/// 역할:
/// - 선물 전송 접수: 카탈로그 해석 + 잔고 사전 확인 + 큐 삽입
/// - 접수는 정산을 의미하지 않음 (정산은 배치 프로세서 담당)
///
/// 특징:
/// - 사전 확인은 빠른 UX용. 정산 시점 잔고가 최종 판정
/// - 같은 키의 재제출은 같은 큐 레코드를 돌려받음
#[derive(Clone)]
pub struct GiftService {
    db: Database,
    balances: BalanceService,
}

impl GiftService {
    pub fn new(db: Database) -> Self {
        Self {
            balances: BalanceService::new(db.clone()),
            db,
        }
    }

    /// 선물 전송 접수
    /// Accept a gift submission
    ///
    /// # Process
    /// 1. 카탈로그에서 코드 해석, 가격 고정
    /// 2. 잔고 사전 확인 (부족하면 즉시 거절)
    /// 3. pending_gifts에 삽입 (키 dedup)
    ///
    /// # Errors
    /// * `UnknownGiftCode` - 카탈로그에 없는 코드
    /// * `InsufficientFunds` - 사전 확인 실패 (접수 자체가 거절됨)
    /// * `IdempotencyConflict` - 같은 키가 다른 파라미터로 재사용됨
    pub async fn submit(&self, req: &GiftRequest) -> Result<u64, LedgerError> {
        if req.quantity <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount: req.quantity as i64,
            });
        }
        if req.sender_id == req.receiver_id {
            return Err(LedgerError::InvalidCounterparty);
        }

        let gift = find_gift(&req.gift_code).ok_or_else(|| LedgerError::UnknownGiftCode {
            code: req.gift_code.clone(),
        })?;

        let total_cost = gift.cost * req.quantity as i64;

        // 잔고 사전 확인: 정산 시점에 잔고가 바뀌었으면 그때 failed로 표시됨
        // Balance pre-check; a later balance change surfaces at settlement
        let available = match self.balances.get_account(req.sender_id).await {
            Ok(account) => account.total(),
            Err(LedgerError::AccountNotFound { .. }) => 0,
            Err(err) => return Err(err),
        };
        if available < total_cost {
            return Err(LedgerError::InsufficientFunds {
                required: total_cost,
                available,
            });
        }

        let repo = PendingGiftRepository::new(self.db.pool().clone());

        let (id, inserted) = repo
            .insert(&NewPendingGift {
                idempotency_key: req.idempotency_key,
                sender_id: req.sender_id,
                receiver_id: req.receiver_id,
                gift_code: gift.code.to_string(),
                unit_cost: gift.cost,
                quantity: req.quantity,
            })
            .await
            .map_err(LedgerError::database)?;

        if !inserted {
            // 재제출: 파라미터가 원래 접수와 같은지 확인 (fail closed)
            // Resubmission: parameters must match the original (fail closed)
            let existing = repo
                .get_by_key(req.idempotency_key)
                .await
                .map_err(LedgerError::database)?
                .ok_or_else(|| {
                    LedgerError::Database("deduped gift disappeared".to_string())
                })?;

            let same = existing.sender_id == req.sender_id
                && existing.receiver_id == req.receiver_id
                && existing.gift_code == req.gift_code
                && existing.quantity == req.quantity;
            if !same {
                return Err(LedgerError::IdempotencyConflict {
                    key: req.idempotency_key,
                });
            }
        }

        Ok(id)
    }

    /// 접수 상태 조회 (정산 실패의 비동기 통지 경로)
    /// Look up a submission (async settlement-failure surface)
    pub async fn get(&self, id: u64) -> Result<PendingGift, LedgerError> {
        let repo = PendingGiftRepository::new(self.db.pool().clone());
        repo.get(id)
            .await
            .map_err(LedgerError::database)?
            .ok_or(LedgerError::GiftNotFound { id })
    }
}
