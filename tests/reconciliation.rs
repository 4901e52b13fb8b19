// =====================================================
// 결제 재조정 통합 테스트
// =====================================================

mod common;
use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use ledger_server::shared::errors::LedgerError;
use ledger_server::domains::payments::models::{CreateOrderRequest, OrderStatus, ReconcileOutcome};

/// 주문 생성 + 프로바이더 완료 주입 헬퍼
/// Create an order and inject provider completion
async fn completed_order(ctx: &TestContext, user: Uuid, package_id: &str) -> String {
    let order = ctx
        .payments
        .create_order(&CreateOrderRequest {
            user_id: user,
            package_id: package_id.to_string(),
        })
        .await
        .expect("order created");

    // 정상 완료: 카탈로그 가격 + 올바른 메타데이터
    // Legitimate completion: catalog price + matching metadata
    let (amount, coins) = match package_id {
        "pkg-300" => (Decimal::new(199, 2), 300),
        "pkg-1000" => (Decimal::new(999, 2), 1_000),
        other => panic!("unexpected package {other}"),
    };
    ctx.provider.set_completed(
        &order.provider_order_id,
        amount,
        &format!("{user}|{coins}"),
    );

    order.provider_order_id
}

/// 테스트: 재조정은 정확히 한 번 지급
///
/// 같은 주문의 두 번째 재조정은 AlreadyCredited이고 잔고는 그대로.
#[tokio::test]
async fn test_reconcile_credits_exactly_once() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let provider_order_id = completed_order(&ctx, user, "pkg-300").await;

    let first = ctx
        .reconciliation
        .reconcile(&provider_order_id)
        .await
        .expect("first reconcile");
    assert!(matches!(first, ReconcileOutcome::Credited { coins: 300, .. }));

    let second = ctx
        .reconciliation
        .reconcile(&provider_order_id)
        .await
        .expect("second reconcile");
    assert!(matches!(second, ReconcileOutcome::AlreadyCredited));

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 300, "exactly one credit");
    assert_eq!(account.earned_balance, 0);
    assert_eq!(ctx.transaction_count(user).await, 1);

    ctx.assert_ledger_matches(user).await;
}

/// 테스트: 웹훅 이중 전달 경쟁
///
/// 같은 주문을 동시에 두 번 재조정해도 paid 크레딧은 한 번만.
#[tokio::test]
async fn test_concurrent_redelivery_race() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let provider_order_id = completed_order(&ctx, user, "pkg-300").await;

    let (a, b) = tokio::join!(
        ctx.reconciliation.reconcile(&provider_order_id),
        ctx.reconciliation.reconcile(&provider_order_id)
    );
    let a = a.expect("reconcile a");
    let b = b.expect("reconcile b");

    let credited = [&a, &b]
        .iter()
        .filter(|o| matches!(o, ReconcileOutcome::Credited { .. }))
        .count();
    assert_eq!(credited, 1, "exactly one delivery may credit");

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 300);
    assert_eq!(ctx.transaction_count(user).await, 1);
}

/// 테스트: 금액 불일치는 운영자 큐로, 절대 지급 안 함
#[tokio::test]
async fn test_amount_mismatch_goes_to_operator_queue() {
    use ledger_server::shared::database::ReconciliationRejectionRepository;

    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let order = ctx
        .payments
        .create_order(&CreateOrderRequest {
            user_id: user,
            package_id: "pkg-300".to_string(),
        })
        .await
        .expect("order created");

    // 변조된 금액 ($0.10, 카탈로그는 $1.99)
    // Tampered amount ($0.10 vs $1.99 catalog price)
    ctx.provider.set_completed(
        &order.provider_order_id,
        Decimal::new(10, 2),
        &format!("{user}|300"),
    );

    let outcome = ctx
        .reconciliation
        .reconcile(&order.provider_order_id)
        .await
        .expect("reconcile completes with rejection");
    assert!(matches!(
        outcome,
        ReconcileOutcome::Rejected { ref reason } if reason == "amount_mismatch"
    ));

    // 지급 없음
    // No credit
    assert!(ctx.balances.get_account(user).await.is_err());

    // 운영자 큐에 기록됨
    // Recorded in the operator queue
    let rejections = ReconciliationRejectionRepository::new(ctx.db.pool().clone())
        .list_recent(None)
        .await
        .expect("rejections");
    assert!(rejections
        .iter()
        .any(|r| r.provider_order_id == order.provider_order_id && r.reason == "amount_mismatch"));

    // 주문은 rejected 상태
    // The order is marked rejected
    use ledger_server::shared::database::CoinOrderRepository;
    let stored = CoinOrderRepository::new(ctx.db.pool().clone())
        .find_by_provider_order(&order.provider_order_id)
        .await
        .expect("query")
        .expect("order exists");
    assert_eq!(stored.status, OrderStatus::Rejected);
}

/// 테스트: 미완료 주문은 지급 없이 Rejected("not_completed")
#[tokio::test]
async fn test_not_completed_is_rejected_without_credit() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let order = ctx
        .payments
        .create_order(&CreateOrderRequest {
            user_id: user,
            package_id: "pkg-300".to_string(),
        })
        .await
        .expect("order created");
    // MockProvider는 생성 직후 미완료 상태로 보관

    let outcome = ctx
        .reconciliation
        .reconcile(&order.provider_order_id)
        .await
        .expect("reconcile");
    assert!(matches!(
        outcome,
        ReconcileOutcome::Rejected { ref reason } if reason == "not_completed"
    ));

    assert!(ctx.balances.get_account(user).await.is_err());
}

/// 테스트: 프로바이더 일시 장애는 에러로 전파 (호출자 재시도)
#[tokio::test]
async fn test_provider_outage_is_transient() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    let provider_order_id = completed_order(&ctx, user, "pkg-300").await;

    ctx.provider.set_unavailable(true);
    let err = ctx
        .reconciliation
        .reconcile(&provider_order_id)
        .await
        .expect_err("outage must surface as an error");
    assert!(matches!(err, LedgerError::ExternalProviderUnavailable(_)));

    // 복구 후 재시도는 정상 지급
    // A retry after recovery credits normally
    ctx.provider.set_unavailable(false);
    let outcome = ctx
        .reconciliation
        .reconcile(&provider_order_id)
        .await
        .expect("retry");
    assert!(matches!(outcome, ReconcileOutcome::Credited { .. }));
}

/// 테스트: 주기 스윕이 유실된 웹훅을 복구
#[tokio::test]
async fn test_sweep_recovers_lost_webhook() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    let user = Uuid::new_v4();

    // 이전 실행이 남긴 미결 주문 제거 (스윕 대상을 이 테스트 것으로 한정)
    // Drop unresolved orders left by earlier runs so the sweep sees ours
    sqlx::query("DELETE FROM coin_orders WHERE status = 'created'")
        .execute(ctx.db.pool())
        .await
        .expect("clear stale orders");

    let provider_order_id = completed_order(&ctx, user, "pkg-1000").await;

    // 웹훅이 오지 않은 채로 스윕 실행 (stale 기준 0초)
    // Run the sweep with no webhook delivered (zero staleness)
    ctx.reconciliation
        .sweep_once(chrono::Duration::zero())
        .await
        .expect("sweep");

    let account = ctx.balances.get_account(user).await.expect("account");
    assert_eq!(account.paid_balance, 1_000);

    // 스윕 재실행은 아무것도 더하지 않음
    // A second sweep adds nothing
    ctx.reconciliation
        .sweep_once(chrono::Duration::zero())
        .await
        .expect("second sweep");
    assert_eq!(ctx.transaction_count(user).await, 1);

    let _ = provider_order_id;
}

/// 테스트: 로컬 기록이 없는 주문은 거부되고 운영자 큐에 남음
#[tokio::test]
async fn test_unknown_order_is_rejected() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;

    let outcome = ctx
        .reconciliation
        .reconcile(&format!("NO-SUCH-{}", Uuid::new_v4()))
        .await
        .expect("reconcile");
    assert!(matches!(
        outcome,
        ReconcileOutcome::Rejected { ref reason } if reason == "unknown_order"
    ));
}
