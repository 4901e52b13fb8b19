// =====================================================
// ReconciliationService - 결제 재조정 워커
// =====================================================
// 역할: 외부 프로바이더의 주문/캡처 이벤트를 원장 크레딧에 정확히 한 번 사상
//
// 처리 흐름:
// 1. 로컬 주문 조회 (external order id)
// 2. 원장에 external_ref가 이미 있으면 AlreadyCredited (멱등 no-op)
// 3. 프로바이더에서 권위 상태 조회
// 4. 메타데이터/금액을 카탈로그 가격과 대조
// 5. 통과 시 Balance Mutator로 paid 크레딧 (kind=purchase)
//
// 실패 정책:
// - 프로바이더 일시 장애: 에러 반환, 웹훅 재전송/주기 스윕이 재시도
// - 영구 불일치 (금액 변조, 미지의 패키지): 운영자 큐에 기록, 절대 자동 지급 안 함
// - 동시 이중 전달: external_ref 유니크 제약이 두 번째 호출을 no-op으로 만듦
// =====================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use chrono::Duration as ChronoDuration;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::shared::clients::PaymentProvider;
use crate::shared::database::{
    CoinOrderRepository, Database, ReconciliationRejectionRepository, TransactionRepository,
};
use crate::shared::errors::LedgerError;
use crate::shared::utils::derived_key;
use crate::domains::ledger::models::TransactionKind;
use crate::domains::ledger::services::balance_service::{ApplyArgs, ApplyOutcome, BalanceService};
use crate::domains::payments::models::{find_package, CoinOrder, OrderStatus, ReconcileOutcome};

type HmacSha256 = Hmac<Sha256>;

/// 웹훅 서명 검증 (공유 비밀키 HMAC-SHA256, 16진수 서명)
/// Verify a webhook signature (shared-secret HMAC-SHA256, hex signature)
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Some(signature) = decode_hex(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    // verify_slice는 상수 시간 비교
    // verify_slice compares in constant time
    mac.verify_slice(&signature).is_ok()
}

/// 서명 생성 (테스트 및 발신측 참조 구현)
/// Sign a payload (tests and the sender-side reference)
pub fn sign_webhook_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(body);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[derive(Clone)]
pub struct ReconciliationService {
    db: Database,
    balances: BalanceService,
    provider: Arc<dyn PaymentProvider>,

    /// 스윕 활성화 상태
    /// Sweep enable flag
    enabled: Arc<AtomicBool>,
}

impl ReconciliationService {
    pub fn new(db: Database, provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            balances: BalanceService::new(db.clone()),
            db,
            provider,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 주문 재조정
    /// Reconcile an order
    ///
    /// # Errors
    /// * `ExternalProviderUnavailable` - 프로바이더 일시 장애 (호출자가 재시도)
    ///
    /// 영구 불일치는 에러가 아니라 Rejected로 반환되고 운영자 큐에 기록됨.
    /// Permanent mismatches return Rejected (recorded for operators),
    /// not an error.
    pub async fn reconcile(
        &self,
        provider_order_id: &str,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let orders = CoinOrderRepository::new(self.db.pool().clone());
        let transactions = TransactionRepository::new(self.db.pool().clone());

        let Some(order) = orders
            .find_by_provider_order(provider_order_id)
            .await
            .map_err(LedgerError::database)?
        else {
            self.reject(provider_order_id, None, "unknown_order", None).await?;
            return Ok(ReconcileOutcome::Rejected {
                reason: "unknown_order".to_string(),
            });
        };

        // 이미 지급됐으면 멱등 no-op
        // Idempotent no-op when already credited
        if transactions
            .exists_external_ref(provider_order_id)
            .await
            .map_err(LedgerError::database)?
        {
            if order.status != OrderStatus::Completed {
                orders
                    .set_status(order.id, OrderStatus::Completed)
                    .await
                    .map_err(LedgerError::database)?;
            }
            return Ok(ReconcileOutcome::AlreadyCredited);
        }

        // 프로바이더의 권위 상태
        // Authoritative provider status
        let status = self
            .provider
            .get_order_status(provider_order_id)
            .await
            .map_err(|e| LedgerError::ExternalProviderUnavailable(format!("{e:#}")))?;

        if !status.completed {
            // 일시적 미완료: 거부 기록 없이 반환 (스윕이 다시 시도)
            // Transient incompleteness: no rejection row (the sweep retries)
            return Ok(ReconcileOutcome::Rejected {
                reason: "not_completed".to_string(),
            });
        }

        // 메타데이터/금액 검증 (실패는 영구 불일치)
        // Metadata/amount validation (failures are permanent)
        if let Err(err) = validate_completed_order(&order, &status) {
            let detail = err.to_string();
            tracing::warn!(
                provider_order_id,
                user_id = %order.user_id,
                detail = %detail,
                "reconciliation rejected, routed to operator queue"
            );

            self.reject(provider_order_id, Some(order.id), rejection_reason(&err), Some(&detail))
                .await?;

            return Ok(ReconcileOutcome::Rejected {
                reason: rejection_reason(&err).to_string(),
            });
        }

        // paid 버킷 크레딧 (external_ref 유니크가 이중 지급을 차단)
        // Credit the paid bucket (external_ref uniqueness blocks doubles)
        let outcome = self
            .balances
            .apply(&ApplyArgs {
                user_id: order.user_id,
                kind: TransactionKind::Purchase,
                amount: order.coins,
                counterparty_id: None,
                idempotency_key: Some(derived_key(&format!("order:{provider_order_id}"))),
                external_ref: Some(provider_order_id.to_string()),
            })
            .await?;

        orders
            .set_status(order.id, OrderStatus::Completed)
            .await
            .map_err(LedgerError::database)?;

        match outcome {
            ApplyOutcome::Applied(applied) => {
                tracing::info!(
                    provider_order_id,
                    user_id = %order.user_id,
                    coins = order.coins,
                    transaction_id = applied.transaction_id,
                    "purchase credited"
                );
                Ok(ReconcileOutcome::Credited {
                    transaction_id: applied.transaction_id,
                    coins: order.coins,
                })
            }
            // 동시 전달 경쟁의 패자
            // Loser of a concurrent delivery race
            ApplyOutcome::AlreadyRecorded => Ok(ReconcileOutcome::AlreadyCredited),
        }
    }

    /// 거부 기록 (운영자 큐 + 주문 상태)
    /// Record a rejection (operator queue + order status)
    async fn reject(
        &self,
        provider_order_id: &str,
        order_id: Option<u64>,
        reason: &str,
        detail: Option<&str>,
    ) -> Result<(), LedgerError> {
        let rejections = ReconciliationRejectionRepository::new(self.db.pool().clone());
        rejections
            .insert(provider_order_id, reason, detail)
            .await
            .map_err(LedgerError::database)?;

        if let Some(order_id) = order_id {
            let orders = CoinOrderRepository::new(self.db.pool().clone());
            orders
                .set_status(order_id, OrderStatus::Rejected)
                .await
                .map_err(LedgerError::database)?;
        }

        Ok(())
    }

    /// 재조정 스윕 시작
    /// Start the reconciliation sweep
    ///
    /// 웹훅이 유실된 주문(created로 남아 있는 오래된 주문)을 주기적으로
    /// 다시 재조정합니다.
    /// Periodically re-reconciles stale created orders whose webhook
    /// was lost.
    pub fn start_sweep(&self, every: Duration) {
        let service = self.clone();
        let staleness = ChronoDuration::from_std(every)
            .unwrap_or_else(|_| ChronoDuration::seconds(300));

        tokio::spawn(async move {
            let mut interval = interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !service.enabled.load(Ordering::Relaxed) {
                    continue;
                }

                if let Err(e) = service.sweep_once(staleness).await {
                    tracing::error!(error = %e, "reconciliation sweep failed");
                }
            }
        });
    }

    /// 스윕 1회 실행
    /// Run one sweep pass
    pub async fn sweep_once(&self, older_than: ChronoDuration) -> Result<(), LedgerError> {
        let orders = CoinOrderRepository::new(self.db.pool().clone());

        let stale = orders
            .list_stale_created(older_than, 100)
            .await
            .map_err(LedgerError::database)?;

        for order in stale {
            let Some(provider_order_id) = order.provider_order_id.as_deref() else {
                continue;
            };

            match self.reconcile(provider_order_id).await {
                Ok(outcome) => {
                    tracing::info!(provider_order_id, ?outcome, "sweep reconciled order");
                }
                // 일시 장애는 다음 스윕에서 다시 시도
                // Transient failures retry on the next sweep
                Err(LedgerError::ExternalProviderUnavailable(e)) => {
                    tracing::warn!(provider_order_id, error = %e, "sweep: provider unavailable");
                }
                Err(e) => {
                    tracing::error!(provider_order_id, error = %e, "sweep: reconcile error");
                }
            }
        }

        Ok(())
    }

    /// 스윕 활성화
    /// Enable the sweep
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// 스윕 비활성화
    /// Disable the sweep
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }
}

/// 완료 주문의 메타데이터/금액 검증
/// Validate a completed order's metadata and amount
fn validate_completed_order(
    order: &CoinOrder,
    status: &crate::shared::clients::ProviderOrderStatus,
) -> Result<(), LedgerError> {
    // 메타데이터 "user_id|coins"가 로컬 주문과 일치해야 함
    // Metadata "user_id|coins" must match the local order
    let metadata = status.metadata.as_deref().unwrap_or("");
    let Some((meta_user, meta_coins)) = parse_metadata(metadata) else {
        return Err(LedgerError::AmountMismatch {
            expected: format!("{}|{}", order.user_id, order.coins),
            actual: format!("unparseable metadata '{metadata}'"),
        });
    };

    if meta_user != order.user_id || meta_coins != order.coins {
        return Err(LedgerError::AmountMismatch {
            expected: format!("{}|{}", order.user_id, order.coins),
            actual: format!("{meta_user}|{meta_coins}"),
        });
    }

    // 패키지는 카탈로그에 있어야 함
    // The package must still be in the catalog
    let Some(package) = find_package(&order.package_id) else {
        return Err(LedgerError::UnknownPackage {
            package_id: order.package_id.clone(),
        });
    };

    // 프로바이더가 보고한 결제 금액 == 카탈로그 가격
    // Provider-reported amount must equal the catalog price
    let expected = package.usd_amount();
    match status.amount {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(LedgerError::AmountMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        None => Err(LedgerError::AmountMismatch {
            expected: expected.to_string(),
            actual: "missing".to_string(),
        }),
    }
}

/// 운영자 큐에 기록할 사유 코드
/// Reason code recorded for operators
fn rejection_reason(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::UnknownPackage { .. } => "unknown_package",
        LedgerError::AmountMismatch { .. } => "amount_mismatch",
        _ => "validation_failed",
    }
}

/// "user_id|coins" 메타데이터 파싱
/// Parse "user_id|coins" metadata
fn parse_metadata(metadata: &str) -> Option<(Uuid, i64)> {
    let (user, coins) = metadata.split_once('|')?;
    Some((user.parse().ok()?, coins.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let user = Uuid::new_v4();
        let parsed = parse_metadata(&format!("{user}|300")).expect("valid metadata");
        assert_eq!(parsed, (user, 300));

        assert!(parse_metadata("no-pipe").is_none());
        assert!(parse_metadata("not-a-uuid|300").is_none());
        assert!(parse_metadata(&format!("{user}|many")).is_none());
    }

    #[test]
    fn test_webhook_signature_roundtrip() {
        let body = br#"{"event_type":"PAYMENT.CAPTURE.COMPLETED"}"#;
        let signature = sign_webhook_payload("secret-1", body);

        assert!(verify_webhook_signature("secret-1", body, &signature));
        assert!(!verify_webhook_signature("secret-2", body, &signature));
        assert!(!verify_webhook_signature("secret-1", b"tampered", &signature));
    }

    #[test]
    fn test_webhook_signature_rejects_garbage() {
        assert!(!verify_webhook_signature("secret", b"body", "zz"));
        assert!(!verify_webhook_signature("secret", b"body", "abc"));
        assert!(!verify_webhook_signature("secret", b"body", ""));
    }
}
