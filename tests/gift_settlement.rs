// =====================================================
// 선물 정산 통합 테스트
// =====================================================

mod common;
use common::*;
use uuid::Uuid;

use ledger_server::domains::gifts::models::GiftStatus;
use ledger_server::shared::errors::LedgerError;

/// 테스트: 정산된 선물은 양쪽 레그를 모두 남김
#[tokio::test]
async fn test_settled_gift_produces_both_legs() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 1_000).await;

    // cash_toss (100코인) 2개 = 200
    let gift_id = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "cash_toss", 2))
        .await
        .expect("gift accepted");

    let run = ctx.settlement.run_cycle(10).await.expect("cycle");
    assert_eq!(run.processed_count, 1);
    assert_eq!(run.error_count, 0);
    assert_eq!(run.backlog_count, 0);

    let gift = ctx.gifts.get(gift_id).await.expect("gift");
    assert_eq!(gift.status, GiftStatus::Settled);

    let sender_account = ctx.balances.get_account(sender).await.expect("sender");
    assert_eq!(sender_account.total(), 800);

    let receiver_account = ctx.balances.get_account(receiver).await.expect("receiver");
    assert_eq!(receiver_account.earned_balance, 200);
    assert_eq!(receiver_account.paid_balance, 0);

    ctx.assert_ledger_matches(sender).await;
    ctx.assert_ledger_matches(receiver).await;
}

/// 테스트: 정산 시점 잔고 부족 → failed, 수신자 크레딧 없음
///
/// 접수와 정산 사이에 잔고가 바뀐 경우. 선물은 failed로 표시되고
/// (조용한 유실 없음) 어느 쪽 잔고도 바뀌지 않습니다.
#[tokio::test]
async fn test_insufficient_at_settlement_fails_gift_atomically() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 1_000).await;

    let gift_id = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "cash_toss", 1))
        .await
        .expect("gift accepted (pre-check passes)");

    // 접수 후, 정산 전에 잔고 소진
    // Drain the balance between submission and settlement
    ctx.spend(sender, 950).await;

    let run = ctx.settlement.run_cycle(10).await.expect("cycle");
    assert_eq!(run.processed_count, 1);
    assert_eq!(run.error_count, 1);

    let gift = ctx.gifts.get(gift_id).await.expect("gift");
    assert_eq!(gift.status, GiftStatus::Failed);
    assert!(
        gift.fail_reason.as_deref().unwrap_or("").contains("insufficient"),
        "failure reason must name the cause"
    );

    // 보낸 쪽 차감 없음, 받는 쪽 크레딧 없음
    // No sender debit, no receiver credit
    let sender_account = ctx.balances.get_account(sender).await.expect("sender");
    assert_eq!(sender_account.total(), 50);
    assert!(ctx.balances.get_account(receiver).await.is_err());

    ctx.assert_ledger_matches(sender).await;
}

/// 테스트: 배치 재실행은 추가 거래를 만들지 않음
///
/// 크래시 복구 재스캔 시뮬레이션: 정산된 선물을 pending으로 되돌리고
/// 사이클을 다시 돌려도 원장은 그대로여야 합니다.
#[tokio::test]
async fn test_batch_replay_adds_zero_transactions() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 500).await;

    let gift_id = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "cash_toss", 1))
        .await
        .expect("gift accepted");

    ctx.settlement.run_cycle(10).await.expect("first cycle");

    let sender_count = ctx.transaction_count(sender).await;
    let receiver_count = ctx.transaction_count(receiver).await;

    // 크래시 재스캔 흉내: settled 행을 강제로 pending으로 되돌림
    // Simulate a crash re-scan: force the settled row back to pending
    sqlx::query(
        "UPDATE pending_gifts SET status = 'pending', next_attempt_at = now(), settled_at = NULL WHERE id = $1",
    )
    .bind(gift_id as i64)
    .execute(ctx.db.pool())
    .await
    .expect("reset gift status");

    let run = ctx.settlement.run_cycle(10).await.expect("replay cycle");
    assert_eq!(run.processed_count, 1);
    assert_eq!(run.error_count, 0, "replay must not count as an error");

    // 원장 무변경, 선물은 다시 settled
    // Ledger unchanged, gift settled again
    assert_eq!(ctx.transaction_count(sender).await, sender_count);
    assert_eq!(ctx.transaction_count(receiver).await, receiver_count);
    let gift = ctx.gifts.get(gift_id).await.expect("gift");
    assert_eq!(gift.status, GiftStatus::Settled);

    let sender_account = ctx.balances.get_account(sender).await.expect("sender");
    assert_eq!(sender_account.total(), 400);
}

/// 테스트: 같은 보낸 사람의 선물은 제출 순서대로, 결정적 부분 성공
///
/// 잔고가 2.5개분일 때 3건을 접수하면 앞의 2건이 정산되고
/// 마지막 1건이 실패해야 합니다 (비결정적 결과 금지).
#[tokio::test]
async fn test_deterministic_partial_success_in_submission_order() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 250).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = ctx
            .gifts
            .submit(&gift_request(sender, receiver, "cash_toss", 1))
            .await
            .expect("gift accepted");
        ids.push(id);
    }

    let run = ctx.settlement.run_cycle(10).await.expect("cycle");
    assert_eq!(run.processed_count, 3);
    assert_eq!(run.error_count, 1);

    // 가장 이른 두 건이 정산, 마지막이 실패
    // Earliest two settle, the last one fails
    assert_eq!(ctx.gifts.get(ids[0]).await.unwrap().status, GiftStatus::Settled);
    assert_eq!(ctx.gifts.get(ids[1]).await.unwrap().status, GiftStatus::Settled);
    assert_eq!(ctx.gifts.get(ids[2]).await.unwrap().status, GiftStatus::Failed);

    let sender_account = ctx.balances.get_account(sender).await.expect("sender");
    assert_eq!(sender_account.total(), 50);

    let receiver_account = ctx.balances.get_account(receiver).await.expect("receiver");
    assert_eq!(receiver_account.earned_balance, 200);

    ctx.assert_ledger_matches(sender).await;
    ctx.assert_ledger_matches(receiver).await;
}

/// 테스트: maxBatchSize 초과분은 백로그로 남음
#[tokio::test]
async fn test_backlog_counts_remaining_pending() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 10_000).await;

    for _ in 0..5 {
        ctx.gifts
            .submit(&gift_request(sender, receiver, "cash_toss", 1))
            .await
            .expect("gift accepted");
    }

    let run = ctx.settlement.run_cycle(2).await.expect("cycle");
    assert_eq!(run.processed_count, 2);
    assert_eq!(run.backlog_count, 3, "remaining pending rows are the backlog");

    // 다음 사이클이 백로그를 마저 비움
    // Following cycles drain the backlog
    let run = ctx.settlement.run_cycle(10).await.expect("second cycle");
    assert_eq!(run.processed_count, 3);
    assert_eq!(run.backlog_count, 0);
}

/// 테스트: 미지의 선물 코드는 접수 거절
#[tokio::test]
async fn test_unknown_gift_code_rejected_at_submission() {
    let ctx = setup_test().await;
    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 1_000).await;

    let err = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "no_such_gift", 1))
        .await
        .expect_err("unknown code must be rejected");
    assert!(matches!(err, LedgerError::UnknownGiftCode { .. }));
}

/// 테스트: 잔고 사전 확인이 즉시 거절을 만듦
#[tokio::test]
async fn test_precheck_rejects_immediately() {
    let ctx = setup_test().await;
    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 50).await;

    let err = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "cash_toss", 1))
        .await
        .expect_err("pre-check must reject: 50 < 100");
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
}

/// 테스트: 만료된 settling 클레임은 다음 사이클이 회수
///
/// 크래시한 인스턴스가 잡아둔 행이 영구 유실되지 않아야 합니다.
#[tokio::test]
async fn test_expired_claim_is_reclaimed() {
    let _guard = queue_lock().await;
    let ctx = setup_test().await;
    ctx.cleanup_gift_queue().await;

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    ctx.credit_paid(sender, 500).await;

    let gift_id = ctx
        .gifts
        .submit(&gift_request(sender, receiver, "cash_toss", 1))
        .await
        .expect("gift accepted");

    // 크래시한 사이클 흉내: 오래된 클레임이 걸린 settling 상태로 만듦
    // Simulate a crashed cycle: a stale settling claim
    sqlx::query(
        r#"
        UPDATE pending_gifts
        SET status = 'settling', claim_token = $1, claimed_at = now() - interval '10 minutes'
        WHERE id = $2
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(gift_id as i64)
    .execute(ctx.db.pool())
    .await
    .expect("simulate stale claim");

    let run = ctx.settlement.run_cycle(10).await.expect("cycle");
    assert_eq!(run.processed_count, 1, "reclaimed gift must be processed");

    let gift = ctx.gifts.get(gift_id).await.expect("gift");
    assert_eq!(gift.status, GiftStatus::Settled);
}
