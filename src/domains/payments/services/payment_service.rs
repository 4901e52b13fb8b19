use std::sync::Arc;

use crate::shared::clients::PaymentProvider;
use crate::shared::database::{CoinOrderRepository, Database};
use crate::shared::errors::LedgerError;
use crate::domains::payments::models::{find_package, CreateOrderRequest, CreateOrderResponse};

/// 결제 주문 서비스
/// Payment Order Service
///
/// 역할:
/// - 패키지 해석 → 로컬 주문 기록 → 프로바이더 주문 생성
/// - 메타데이터 "user_id|coins"를 주문에 실어 보냄 (재조정 시 회수)
///
/// 주의:
/// - 이 서비스는 코인을 지급하지 않음. 지급은 재조정 경로의 몫
#[derive(Clone)]
pub struct PaymentService {
    db: Database,
    provider: Arc<dyn PaymentProvider>,
}

impl PaymentService {
    pub fn new(db: Database, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { db, provider }
    }

    /// 코인 주문 생성
    /// Create a coin order
    ///
    /// # Process
    /// 1. 카탈로그에서 패키지 해석
    /// 2. 로컬 coin_orders 행 생성 (status = created)
    /// 3. 프로바이더 주문 생성, 주문 ID 연결
    ///
    /// # Errors
    /// * `UnknownPackage` - 카탈로그에 없는 패키지
    /// * `ExternalProviderUnavailable` - 프로바이더 호출 실패 (재시도 가능)
    pub async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, LedgerError> {
        let package = find_package(&req.package_id).ok_or_else(|| LedgerError::UnknownPackage {
            package_id: req.package_id.clone(),
        })?;

        let orders = CoinOrderRepository::new(self.db.pool().clone());

        let order_id = orders
            .insert(req.user_id, package.id, package.coins, package.usd_amount())
            .await
            .map_err(LedgerError::database)?;

        // 메타데이터 형식: "user_id|coins" (캡처 시 파싱)
        // Metadata format: "user_id|coins" (parsed at capture time)
        let metadata = format!("{}|{}", req.user_id, package.coins);

        let provider_order = self
            .provider
            .create_order(package.usd_amount(), "USD", &metadata)
            .await
            .map_err(|e| LedgerError::ExternalProviderUnavailable(format!("{e:#}")))?;

        orders
            .set_provider_order(order_id, &provider_order.order_id)
            .await
            .map_err(LedgerError::database)?;

        Ok(CreateOrderResponse {
            order_id,
            provider_order_id: provider_order.order_id,
        })
    }
}
