use std::collections::HashMap;
use std::sync::Mutex;
use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::paypal::{PaymentProvider, ProviderOrder, ProviderOrderStatus};

/// Mock PaymentProvider (테스트용 구현)
/// Mock PaymentProvider (implementation for testing)
///
/// 실제 프로바이더 없이 재조정 경로를 구동하기 위한 인메모리 구현입니다.
/// 주문 상태를 직접 주입할 수 있고, 일시 장애도 흉내낼 수 있습니다.
/// In-memory implementation to drive the reconciliation path without a
/// real provider; order states are injectable, transient failures can
/// be simulated.
pub struct MockProvider {
    orders: Mutex<HashMap<String, ProviderOrderStatus>>,
    /// true면 모든 호출이 일시 장애로 실패
    /// When true every call fails transiently
    unavailable: Mutex<bool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
        }
    }

    /// 완료된 주문 주입
    /// Inject a completed order
    pub fn set_completed(&self, order_id: &str, amount: Decimal, metadata: &str) {
        self.orders.lock().unwrap().insert(
            order_id.to_string(),
            ProviderOrderStatus {
                completed: true,
                amount: Some(amount),
                currency: Some("USD".to_string()),
                metadata: Some(metadata.to_string()),
            },
        );
    }

    /// 미완료 주문 주입
    /// Inject an incomplete order
    pub fn set_incomplete(&self, order_id: &str) {
        self.orders.lock().unwrap().insert(
            order_id.to_string(),
            ProviderOrderStatus {
                completed: false,
                amount: None,
                currency: None,
                metadata: None,
            },
        );
    }

    /// 일시 장애 모드 전환
    /// Toggle transient failure mode
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_order(
        &self,
        amount: Decimal,
        _currency: &str,
        metadata: &str,
    ) -> Result<ProviderOrder> {
        if *self.unavailable.lock().unwrap() {
            bail!("mock provider unavailable");
        }

        let order_id = format!("MOCK-{}", Uuid::new_v4());

        // 생성 직후는 미완료 상태 (승인 전)
        // Freshly created orders are incomplete (pre-approval)
        self.orders.lock().unwrap().insert(
            order_id.clone(),
            ProviderOrderStatus {
                completed: false,
                amount: Some(amount),
                currency: Some("USD".to_string()),
                metadata: Some(metadata.to_string()),
            },
        );

        Ok(ProviderOrder { order_id })
    }

    async fn get_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus> {
        if *self.unavailable.lock().unwrap() {
            bail!("mock provider unavailable");
        }

        match self.orders.lock().unwrap().get(order_id) {
            Some(status) => Ok(status.clone()),
            None => bail!("mock provider: unknown order {order_id}"),
        }
    }
}
