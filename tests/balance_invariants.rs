// =====================================================
// 잔고 불변식 통합 테스트
// =====================================================

mod common;
use common::*;
use uuid::Uuid;

use ledger_server::shared::errors::LedgerError;
use ledger_server::domains::ledger::models::{
    Bucket, OperationRequest, PayoutRequestBody, TransactionKind,
};

/// 테스트: 원장 재구성 불변식
///
/// 연산 시퀀스의 매 지점에서 프로젝션 == 버킷별 delta 합이어야 합니다.
#[tokio::test]
async fn test_projection_matches_ledger_at_every_step() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 300).await;
    ctx.assert_ledger_matches(user).await;

    ctx.credit_earned(user, 25).await;
    ctx.assert_ledger_matches(user).await;

    ctx.spend(user, 100).await;
    ctx.assert_ledger_matches(user).await;

    ctx.credit_paid(user, 500).await;
    ctx.assert_ledger_matches(user).await;

    ctx.spend(user, 700).await;
    ctx.assert_ledger_matches(user).await;

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.total(), 25);
}

/// 테스트: 음수 잔고 거부, 잔고/원장 무변경
#[tokio::test]
async fn test_overdraft_rejected_and_state_unchanged() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 300).await;
    ctx.credit_earned(user, 25).await;

    let before_count = ctx.transaction_count(user).await;

    let err = ctx
        .operations
        .submit(&OperationRequest {
            idempotency_key: Uuid::new_v4(),
            user_id: user,
            kind: TransactionKind::Spend,
            amount: 1_000,
            counterparty_id: None,
        })
        .await
        .expect_err("overdraft must be rejected");
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 300);
    assert_eq!(account.earned_balance, 25);
    assert_eq!(ctx.transaction_count(user).await, before_count);
    ctx.assert_ledger_matches(user).await;
}

/// 테스트: earned 우선 소비가 버킷을 가로질러 분할됨
///
/// 분할 소비는 같은 멱등 키를 가진 두 거래 행을 남깁니다.
#[tokio::test]
async fn test_spend_splits_earned_then_paid() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 70).await;
    ctx.credit_earned(user, 30).await;

    ctx.spend(user, 100).await;

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 0);
    assert_eq!(account.earned_balance, 0);

    // 크레딧 2건 + 분할 소비 2건
    // Two credits + two split-spend legs
    assert_eq!(ctx.transaction_count(user).await, 4);

    let transactions = ctx
        .operations
        .list_transactions(user, None)
        .await
        .expect("transactions");
    let spend_legs: Vec<_> = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Spend)
        .collect();
    assert_eq!(spend_legs.len(), 2);
    assert_eq!(spend_legs[0].idempotency_key, spend_legs[1].idempotency_key);
    assert!(spend_legs.iter().any(|t| t.bucket == Bucket::Earned && t.delta == -30));
    assert!(spend_legs.iter().any(|t| t.bucket == Bucket::Paid && t.delta == -70));

    ctx.assert_ledger_matches(user).await;
}

/// 테스트: 상대방 크레딧이 있는 소비 (프로필 열람 수수료)
///
/// 차감과 상대방 earned 크레딧이 하나의 원자적 단위로 커밋됩니다.
#[tokio::test]
async fn test_spend_with_counterparty_credits_earned() {
    let ctx = setup_test().await;
    let viewer = Uuid::new_v4();
    let owner = Uuid::new_v4();

    ctx.credit_paid(viewer, 500).await;

    ctx.operations
        .submit(&OperationRequest {
            idempotency_key: Uuid::new_v4(),
            user_id: viewer,
            kind: TransactionKind::Spend,
            amount: 50,
            counterparty_id: Some(owner),
        })
        .await
        .expect("profile-view fee");

    let viewer_account = ctx.balances.get_account(viewer).await.expect("viewer");
    assert_eq!(viewer_account.total(), 450);

    let owner_account = ctx.balances.get_account(owner).await.expect("owner");
    assert_eq!(owner_account.earned_balance, 50);
    assert_eq!(owner_account.paid_balance, 0);

    ctx.assert_ledger_matches(viewer).await;
    ctx.assert_ledger_matches(owner).await;
}

/// 테스트: 현금화는 paid 전용 차감
///
/// 자격은 총 잔고 기준, 차감은 paid에서만.
#[tokio::test]
async fn test_payout_debits_paid_only() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 12_000).await;
    ctx.credit_earned(user, 5_000).await;

    let response = ctx
        .operations
        .request_payout(&PayoutRequestBody {
            idempotency_key: Uuid::new_v4(),
            user_id: user,
            tier_id: "basic".to_string(),
        })
        .await
        .expect("payout");

    assert_eq!(response.coins, 12_000);
    assert!(!response.duplicate);

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 0, "payout must debit paid only");
    assert_eq!(account.earned_balance, 5_000, "earned must be untouched");

    ctx.assert_ledger_matches(user).await;
}

/// 테스트: 총 잔고로는 자격이 되지만 paid가 부족한 현금화
///
/// earned가 아무리 많아도 paid 부족이면 InsufficientFunds로 거절,
/// 잔고는 그대로.
#[tokio::test]
async fn test_payout_rejected_when_paid_insufficient() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 5_000).await;
    ctx.credit_earned(user, 20_000).await; // 총 25,000 → basic 자격

    let err = ctx
        .operations
        .request_payout(&PayoutRequestBody {
            idempotency_key: Uuid::new_v4(),
            user_id: user,
            tier_id: "basic".to_string(),
        })
        .await
        .expect_err("paid bucket cannot cover the tier");
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 5_000);
    assert_eq!(account.earned_balance, 20_000);
}

/// 테스트: 티어 미달 현금화 거절
#[tokio::test]
async fn test_payout_rejected_below_threshold() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    ctx.credit_paid(user, 11_999).await;

    let err = ctx
        .operations
        .request_payout(&PayoutRequestBody {
            idempotency_key: Uuid::new_v4(),
            user_id: user,
            tier_id: "basic".to_string(),
        })
        .await
        .expect_err("11999 is below the basic threshold");
    assert!(matches!(err, LedgerError::TierNotEligible { .. }));
}

/// 테스트: 현금화 재제출은 이중 차감하지 않음
#[tokio::test]
async fn test_payout_replay_is_duplicate() {
    let ctx = setup_test().await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    ctx.credit_paid(user, 30_000).await;

    let body = PayoutRequestBody {
        idempotency_key: key,
        user_id: user,
        tier_id: "basic".to_string(),
    };

    let first = ctx.operations.request_payout(&body).await.expect("payout");
    assert!(!first.duplicate);

    let second = ctx.operations.request_payout(&body).await.expect("replay");
    assert!(second.duplicate);
    assert_eq!(second.transaction_id, first.transaction_id);

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 18_000, "only one 12000 debit applied");
}

/// 테스트: 일일 리워드는 하루 한 번만 적립
#[tokio::test]
async fn test_daily_reward_is_idempotent_per_day() {
    use ledger_server::domains::ledger::models::RewardRole;

    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let first = ctx
        .operations
        .grant_daily_reward(user, RewardRole::Broadcaster)
        .await
        .expect("first grant");
    assert!(!first.duplicate);
    assert_eq!(first.new_balance, 25);

    let second = ctx
        .operations
        .grant_daily_reward(user, RewardRole::Broadcaster)
        .await
        .expect("same-day retry");
    assert!(second.duplicate);

    // 역할이 다르면 별도 리워드
    // A different role is a separate reward
    let viewer = ctx
        .operations
        .grant_daily_reward(user, RewardRole::Viewer)
        .await
        .expect("viewer grant");
    assert!(!viewer.duplicate);

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.earned_balance, 35);
    ctx.assert_ledger_matches(user).await;
}
