// =====================================================
// 멱등성 통합 테스트
// =====================================================

mod common;
use common::*;
use uuid::Uuid;

use ledger_server::shared::errors::LedgerError;
use ledger_server::domains::ledger::models::{OperationRequest, TransactionKind};

/// 테스트: 같은 (키, 파라미터)의 순차 재제출
///
/// 거래는 정확히 한 건, 두 응답은 동일한 성공 페이로드여야 합니다.
#[tokio::test]
async fn test_duplicate_sequential_submission() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    let req = OperationRequest {
        idempotency_key: key,
        user_id: user,
        kind: TransactionKind::Purchase,
        amount: 300,
        counterparty_id: None,
    };

    let first = ctx.operations.submit(&req).await.expect("first submit");
    assert!(!first.duplicate);
    assert_eq!(first.new_balance, 300);

    let second = ctx.operations.submit(&req).await.expect("second submit");
    assert!(second.duplicate, "replay must be flagged as duplicate");
    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(second.new_balance, first.new_balance);

    // 잔고는 300 (600이 아님), 거래는 한 건
    // Balance is 300 (not 600), exactly one transaction
    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.total(), 300);
    assert_eq!(ctx.transaction_count(user).await, 1);

    ctx.assert_ledger_matches(user).await;
}

/// 테스트: 같은 새 키의 동시 제출
///
/// 정확히 하나의 Fresh 승자, 패자는 같은 성공 응답을 Duplicate로 수신.
#[tokio::test]
async fn test_duplicate_concurrent_submission() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    let req = OperationRequest {
        idempotency_key: key,
        user_id: user,
        kind: TransactionKind::Purchase,
        amount: 300,
        counterparty_id: None,
    };

    let (a, b) = tokio::join!(ctx.operations.submit(&req), ctx.operations.submit(&req));
    let a = a.expect("concurrent submit a");
    let b = b.expect("concurrent submit b");

    // 정확히 하나만 fresh
    // Exactly one fresh winner
    assert_eq!(
        [a.duplicate, b.duplicate].iter().filter(|d| **d).count(),
        1,
        "exactly one of two concurrent submissions must be a duplicate"
    );
    assert_eq!(a.transaction_id, b.transaction_id);
    assert_eq!(a.new_balance, b.new_balance);

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.total(), 300);
    assert_eq!(ctx.transaction_count(user).await, 1);
}

/// 테스트: 같은 키 + 다른 파라미터는 fail closed
#[tokio::test]
async fn test_fingerprint_conflict_fails_closed() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    ctx.operations
        .submit(&OperationRequest {
            idempotency_key: key,
            user_id: user,
            kind: TransactionKind::Purchase,
            amount: 300,
            counterparty_id: None,
        })
        .await
        .expect("original submit");

    // 같은 키, 다른 금액
    // Same key, different amount
    let err = ctx
        .operations
        .submit(&OperationRequest {
            idempotency_key: key,
            user_id: user,
            kind: TransactionKind::Purchase,
            amount: 500,
            counterparty_id: None,
        })
        .await
        .expect_err("conflicting reuse must fail");

    assert!(matches!(err, LedgerError::IdempotencyConflict { .. }));

    // 어느 버전도 추가 적용되지 않음
    // Neither version was applied a second time
    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.total(), 300);
}

/// 테스트: 실패한 연산의 키는 재시도 가능하게 남음
///
/// 잔고 부족으로 거절된 키로, 입금 후 다시 제출하면 성공해야 합니다.
#[tokio::test]
async fn test_failed_operation_keeps_key_retryable() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    let spend = OperationRequest {
        idempotency_key: key,
        user_id: user,
        kind: TransactionKind::Spend,
        amount: 100,
        counterparty_id: None,
    };

    let err = ctx
        .operations
        .submit(&spend)
        .await
        .expect_err("spend with empty balance must fail");
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    // 입금 후 같은 키로 재시도
    // Top up, then retry with the same key
    ctx.credit_paid(user, 100).await;

    let retry = ctx.operations.submit(&spend).await.expect("retry succeeds");
    assert!(!retry.duplicate);
    assert_eq!(retry.new_balance, 0);

    ctx.assert_ledger_matches(user).await;
}

/// 테스트: 선물 접수의 키 dedup
///
/// 같은 키로 재제출하면 같은 큐 레코드 ID를 돌려받고,
/// 파라미터가 다르면 IdempotencyConflict.
#[tokio::test]
async fn test_gift_submission_dedup() {
    let ctx = setup_test().await;
    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();

    ctx.credit_paid(sender, 1_000).await;

    let req = gift_request(sender, receiver, "cash_toss", 1);

    let first = ctx.gifts.submit(&req).await.expect("first submission");
    let second = ctx.gifts.submit(&req).await.expect("resubmission");
    assert_eq!(first, second, "resubmission must return the same queue record");

    // 같은 키, 다른 수량
    // Same key, different quantity
    let mut conflicting = gift_request(sender, receiver, "cash_toss", 2);
    conflicting.idempotency_key = req.idempotency_key;

    let err = ctx
        .gifts
        .submit(&conflicting)
        .await
        .expect_err("conflicting gift reuse must fail");
    assert!(matches!(err, LedgerError::IdempotencyConflict { .. }));
}
