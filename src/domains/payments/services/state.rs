// Payments domain state
// 결제 도메인 상태
use std::sync::Arc;

use crate::shared::clients::PaymentProvider;
use crate::shared::database::Database;
use crate::domains::payments::services::{PaymentService, ReconciliationService};

/// Payments domain state
/// 결제 도메인에서 필요한 서비스들을 포함하는 상태
#[derive(Clone)]
pub struct PaymentsState {
    pub payment_service: PaymentService,
    pub reconciliation_service: ReconciliationService,
}

impl PaymentsState {
    /// Create PaymentsState with database and provider
    /// PaymentsState 생성 (데이터베이스 + 프로바이더 필요)
    ///
    /// 프로바이더는 trait 객체로 주입: 운영은 PayPalClient, 테스트는 MockProvider.
    /// The provider is injected as a trait object: PayPalClient in
    /// production, MockProvider in tests.
    pub fn new(db: Database, provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            payment_service: PaymentService::new(db.clone(), provider.clone()),
            reconciliation_service: ReconciliationService::new(db, provider),
        }
    }
}
