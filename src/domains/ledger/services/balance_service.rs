// =====================================================
// BalanceService - 잔고 변경 엔진 (Balance Mutator)
// =====================================================
// 역할: 잔고를 바꿀 수 있는 유일한 코드 경로
//
// 핵심 책임:
// 1. 계정 행 쓰기 잠금 (사용자별 직렬화)
// 2. 버킷 정책에 따른 레그 계산 (순수 함수)
// 3. 불변식 검증 (음수 잔고 금지)
// 4. 거래 append + 프로젝션 갱신을 하나의 트랜잭션으로 커밋
//
// 처리 흐름:
// ensure_exists → FOR UPDATE 잠금 → plan_legs → insert → update → commit
//
// 안전성:
// - 커밋 전에는 어떤 독자도 중간 상태를 보지 못함
// - 같은 사용자의 동시 호출은 행 잠금에서 직렬화됨
// - 다른 사용자끼리는 완전 병렬
// =====================================================

use uuid::Uuid;

use crate::shared::database::{
    AccountRepository, Database, NewTransaction, TransactionRepository,
};
use crate::shared::errors::{is_unique_violation, LedgerError};
use crate::domains::ledger::models::{Bucket, TransactionKind};

/// 단일 계정 변경 요청
/// Single-account mutation request
#[derive(Debug, Clone)]
pub struct ApplyArgs {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// 코인 수량 (항상 양수, 방향은 kind가 결정)
    /// Coin amount (always positive; kind decides direction)
    pub amount: i64,
    /// 거래 행에 기록할 상대방
    /// Counterparty recorded on the rows
    pub counterparty_id: Option<Uuid>,
    pub idempotency_key: Option<Uuid>,
    pub external_ref: Option<String>,
}

/// 변경 결과
/// Mutation result
#[derive(Debug, Clone)]
pub struct Applied {
    /// 대표 거래 ID (마지막 레그)
    /// Primary transaction id (last leg)
    pub transaction_id: u64,
    pub paid_balance: i64,
    pub earned_balance: i64,
}

impl Applied {
    pub fn total(&self) -> i64 {
        self.paid_balance + self.earned_balance
    }
}

/// 변경 결과 분류
/// Mutation outcome
#[derive(Debug)]
pub enum ApplyOutcome {
    Applied(Applied),
    /// 멱등 키 또는 external_ref가 이미 원장에 있음 (재생)
    /// The idempotency key or external_ref is already in the ledger (replay)
    AlreadyRecorded,
}

/// P2P 이전 요청 (선물 정산, 프로필 열람 수수료)
/// Peer-to-peer transfer request (gift settlement, profile-view fee)
#[derive(Debug, Clone)]
pub struct TransferArgs {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
    pub debit_kind: TransactionKind,
    pub credit_kind: TransactionKind,
    pub debit_key: Uuid,
    pub credit_key: Uuid,
}

/// P2P 이전 결과
/// Transfer result
#[derive(Debug)]
pub enum TransferOutcome {
    Applied(TransferApplied),
    /// 두 레그가 이미 기록되어 있음 (사이클 재생)
    /// Both legs are already recorded (cycle replay)
    AlreadyApplied,
}

#[derive(Debug, Clone)]
pub struct TransferApplied {
    pub debit_transaction_id: u64,
    pub credit_transaction_id: u64,
    pub sender_total: i64,
    pub receiver_total: i64,
}

/// 버킷 정책에 따른 레그 계산 (순수 함수)
/// Compute mutation legs per bucket policy (pure function)
///
/// 정책:
/// - purchase / reconcile: paid 크레딧
/// - reward / gift_receive: earned 크레딧
/// - spend / gift_send: earned 우선 차감, 부족분은 paid에서
/// - payout: paid 전용 차감
/// Policy:
/// - purchase / reconcile: credit paid
/// - reward / gift_receive: credit earned
/// - spend / gift_send: debit earned first, remainder from paid
/// - payout: debit paid only
pub fn plan_legs(
    kind: TransactionKind,
    amount: i64,
    paid_balance: i64,
    earned_balance: i64,
) -> Result<Vec<(Bucket, i64)>, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }

    match kind {
        TransactionKind::Purchase | TransactionKind::Reconcile => {
            Ok(vec![(Bucket::Paid, amount)])
        }

        TransactionKind::Reward | TransactionKind::GiftReceive => {
            Ok(vec![(Bucket::Earned, amount)])
        }

        TransactionKind::Spend | TransactionKind::GiftSend => {
            if earned_balance + paid_balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available: earned_balance + paid_balance,
                });
            }

            let from_earned = earned_balance.min(amount);
            let from_paid = amount - from_earned;

            let mut legs = Vec::with_capacity(2);
            if from_earned > 0 {
                legs.push((Bucket::Earned, -from_earned));
            }
            if from_paid > 0 {
                legs.push((Bucket::Paid, -from_paid));
            }
            Ok(legs)
        }

        TransactionKind::Payout => {
            if paid_balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available: paid_balance,
                });
            }
            Ok(vec![(Bucket::Paid, -amount)])
        }
    }
}

/// 저수준 버킷 호환성 검증
/// Low-level kind/bucket compatibility check
///
/// purchase 전용 버킷에 earned를 차감하는 식의 호출을 fail-closed로 거부.
/// Rejects calls like debiting earned for a paid-only action, fail closed.
pub fn validate_bucket(
    kind: TransactionKind,
    bucket: Bucket,
    delta: i64,
) -> Result<(), LedgerError> {
    let ok = match kind {
        TransactionKind::Purchase | TransactionKind::Reconcile => {
            bucket == Bucket::Paid && delta > 0
        }
        TransactionKind::Reward | TransactionKind::GiftReceive => {
            bucket == Bucket::Earned && delta > 0
        }
        TransactionKind::Spend | TransactionKind::GiftSend => delta < 0,
        TransactionKind::Payout => bucket == Bucket::Paid && delta < 0,
    };

    if ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidBucket {
            kind: kind.as_str().to_string(),
            bucket: bucket.as_str().to_string(),
        })
    }
}

#[derive(Clone)]
pub struct BalanceService {
    db: Database,
}

impl BalanceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 단일 계정 변경 (하나의 원자적 단위)
    /// Single-account mutation (one atomic unit)
    ///
    /// # Process
    /// 1. 계정 lazy 생성
    /// 2. FOR UPDATE로 현재 잔고 읽기
    /// 3. 레그 계산 + 불변식 검증
    /// 4. 거래 행 append (레그당 한 행)
    /// 5. 프로젝션 갱신, 커밋
    ///
    /// # Errors
    /// * `InsufficientFunds` - 차감이 버킷을 음수로 만들 때 (변경 없음)
    /// * `InvalidAmount` - amount <= 0
    pub async fn apply(&self, args: &ApplyArgs) -> Result<ApplyOutcome, LedgerError> {
        let accounts = AccountRepository::new(self.db.pool().clone());
        let transactions = TransactionRepository::new(self.db.pool().clone());

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        accounts
            .ensure_exists(&mut tx, args.user_id)
            .await
            .map_err(LedgerError::database)?;

        let account = accounts
            .lock(&mut tx, args.user_id)
            .await
            .map_err(LedgerError::database)?;

        let legs = plan_legs(
            args.kind,
            args.amount,
            account.paid_balance,
            account.earned_balance,
        )?;

        let mut paid = account.paid_balance;
        let mut earned = account.earned_balance;
        let mut last_id = 0u64;

        for (bucket, delta) in &legs {
            validate_bucket(args.kind, *bucket, *delta)?;

            let insert = transactions
                .insert(
                    &mut tx,
                    &NewTransaction {
                        user_id: args.user_id,
                        counterparty_id: args.counterparty_id,
                        bucket: *bucket,
                        delta: *delta,
                        kind: args.kind,
                        idempotency_key: args.idempotency_key,
                        external_ref: args.external_ref.clone(),
                    },
                )
                .await;

            last_id = match insert {
                Ok(id) => id,
                Err(err) if is_unique_violation(&err) => {
                    // 이미 기록된 키/참조: 트랜잭션 전체를 되돌리고 재생으로 분류
                    // Key/ref already recorded: roll back and classify as replay
                    let _ = tx.rollback().await;
                    return Ok(ApplyOutcome::AlreadyRecorded);
                }
                Err(err) => return Err(LedgerError::Database(err.to_string())),
            };

            match bucket {
                Bucket::Paid => paid += delta,
                Bucket::Earned => earned += delta,
            }
        }

        accounts
            .update_balances(&mut tx, args.user_id, paid, earned)
            .await
            .map_err(LedgerError::database)?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(ApplyOutcome::Applied(Applied {
            transaction_id: last_id,
            paid_balance: paid,
            earned_balance: earned,
        }))
    }

    /// P2P 이전 (양쪽 레그가 하나의 원자적 단위)
    /// Peer-to-peer transfer (both legs in one atomic unit)
    ///
    /// 보낸 쪽 차감과 받는 쪽 크레딧이 함께 커밋되거나 함께 버려짐.
    /// 잔고 부족이면 수신자 크레딧 없이 전체가 롤백됨.
    /// Sender debit and receiver credit commit together or not at all;
    /// insufficient funds rolls back everything, the receiver is never
    /// credited alone.
    ///
    /// 교착 방지: 두 계정 행을 항상 UUID 오름차순으로 잠금.
    /// Deadlock avoidance: lock both rows in ascending UUID order.
    pub async fn transfer(&self, args: &TransferArgs) -> Result<TransferOutcome, LedgerError> {
        if args.amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount: args.amount });
        }
        if args.sender_id == args.receiver_id {
            return Err(LedgerError::InvalidCounterparty);
        }

        let accounts = AccountRepository::new(self.db.pool().clone());
        let transactions = TransactionRepository::new(self.db.pool().clone());

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        // 잠금/생성 순서 고정 (UUID 오름차순) - 반대 방향 이전과의 교착 방지
        // Fixed create/lock order (ascending UUID) against opposite-direction transfers
        let (first, second) = if args.sender_id < args.receiver_id {
            (args.sender_id, args.receiver_id)
        } else {
            (args.receiver_id, args.sender_id)
        };

        accounts
            .ensure_exists(&mut tx, first)
            .await
            .map_err(LedgerError::database)?;
        accounts
            .ensure_exists(&mut tx, second)
            .await
            .map_err(LedgerError::database)?;

        let first_account = accounts
            .lock(&mut tx, first)
            .await
            .map_err(LedgerError::database)?;
        let second_account = accounts
            .lock(&mut tx, second)
            .await
            .map_err(LedgerError::database)?;

        let (sender, receiver) = if first == args.sender_id {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        // 보낸 쪽 레그 계산 (earned 우선)
        // Sender legs (earned first)
        let debit_legs = plan_legs(
            args.debit_kind,
            args.amount,
            sender.paid_balance,
            sender.earned_balance,
        )?;

        let mut sender_paid = sender.paid_balance;
        let mut sender_earned = sender.earned_balance;
        let mut debit_id = 0u64;

        for (bucket, delta) in &debit_legs {
            let insert = transactions
                .insert(
                    &mut tx,
                    &NewTransaction {
                        user_id: args.sender_id,
                        counterparty_id: Some(args.receiver_id),
                        bucket: *bucket,
                        delta: *delta,
                        kind: args.debit_kind,
                        idempotency_key: Some(args.debit_key),
                        external_ref: None,
                    },
                )
                .await;

            debit_id = match insert {
                Ok(id) => id,
                Err(err) if is_unique_violation(&err) => {
                    let _ = tx.rollback().await;
                    return Ok(TransferOutcome::AlreadyApplied);
                }
                Err(err) => return Err(LedgerError::Database(err.to_string())),
            };

            match bucket {
                Bucket::Paid => sender_paid += delta,
                Bucket::Earned => sender_earned += delta,
            }
        }

        // 받는 쪽 크레딧 (earned)
        // Receiver credit (earned)
        let insert = transactions
            .insert(
                &mut tx,
                &NewTransaction {
                    user_id: args.receiver_id,
                    counterparty_id: Some(args.sender_id),
                    bucket: Bucket::Earned,
                    delta: args.amount,
                    kind: args.credit_kind,
                    idempotency_key: Some(args.credit_key),
                    external_ref: None,
                },
            )
            .await;

        let credit_id = match insert {
            Ok(id) => id,
            Err(err) if is_unique_violation(&err) => {
                let _ = tx.rollback().await;
                return Ok(TransferOutcome::AlreadyApplied);
            }
            Err(err) => return Err(LedgerError::Database(err.to_string())),
        };

        accounts
            .update_balances(&mut tx, args.sender_id, sender_paid, sender_earned)
            .await
            .map_err(LedgerError::database)?;
        accounts
            .update_balances(
                &mut tx,
                args.receiver_id,
                receiver.paid_balance,
                receiver.earned_balance + args.amount,
            )
            .await
            .map_err(LedgerError::database)?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(TransferOutcome::Applied(TransferApplied {
            debit_transaction_id: debit_id,
            credit_transaction_id: credit_id,
            sender_total: sender_paid + sender_earned,
            receiver_total: receiver.paid_balance + receiver.earned_balance + args.amount,
        }))
    }

    /// 계정 조회
    /// Get account
    pub async fn get_account(
        &self,
        user_id: Uuid,
    ) -> Result<crate::domains::ledger::models::Account, LedgerError> {
        let accounts = AccountRepository::new(self.db.pool().clone());
        accounts
            .get(user_id)
            .await
            .map_err(LedgerError::database)?
            .ok_or(LedgerError::AccountNotFound { user_id })
    }
}
