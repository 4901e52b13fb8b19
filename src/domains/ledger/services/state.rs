// Ledger domain state
// 원장 도메인 상태
use crate::shared::database::Database;
use crate::domains::ledger::services::{BalanceService, OperationService};

/// Ledger domain state
/// 원장 도메인에서 필요한 서비스들을 포함하는 상태
#[derive(Clone)]
pub struct LedgerState {
    pub operation_service: OperationService,
    pub balance_service: BalanceService,
}

impl LedgerState {
    /// Create LedgerState with database
    /// LedgerState 생성 (데이터베이스 필요)
    pub fn new(db: Database) -> Self {
        Self {
            operation_service: OperationService::new(db.clone()),
            balance_service: BalanceService::new(db),
        }
    }
}
