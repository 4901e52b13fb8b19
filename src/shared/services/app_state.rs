use std::sync::Arc;

use anyhow::Result;

use crate::shared::clients::{PaymentProvider, PayPalClient};
use crate::shared::config::Config;
use crate::shared::database::Database;
use crate::domains::gifts::services::GiftsState;
use crate::domains::ledger::services::LedgerState;
use crate::domains::payments::services::PaymentsState;

/// Application state (combines all domain states)
/// 애플리케이션 상태 (모든 도메인 상태를 조합)
///
/// 역할: 각 도메인의 State를 조합하여 전체 애플리케이션 상태를 관리.
/// 전역 가변 싱글톤 없음 - 모든 워커/핸들러는 여기서 주입받은
/// 서비스(풀 clone)만 사용.
/// No process-wide mutable singleton: every worker/handler uses only
/// the services (pool clones) injected here.
#[derive(Clone)]
pub struct AppState {
    /// 데이터베이스 연결 (공유)
    /// Database connection (shared)
    pub db: Database,
    pub config: Config,
    pub ledger_state: LedgerState,
    pub gifts_state: GiftsState,
    pub payments_state: PaymentsState,
}

impl AppState {
    /// Create AppState with database
    /// 모든 도메인 State를 초기화하고 조합
    pub fn new(db: Database, config: Config) -> Result<Self> {
        // 결제 프로바이더 (운영: PayPal)
        // Payment provider (production: PayPal)
        let provider: Arc<dyn PaymentProvider> = Arc::new(PayPalClient::new(
            config.paypal_base_url.clone(),
            config.paypal_client_id.clone(),
            config.paypal_client_secret.clone(),
        )?);

        Self::with_provider(db, config, provider)
    }

    /// Create AppState with an injected provider (tests use MockProvider)
    /// 프로바이더를 주입하여 생성 (테스트는 MockProvider 사용)
    pub fn with_provider(
        db: Database,
        config: Config,
        provider: Arc<dyn PaymentProvider>,
    ) -> Result<Self> {
        let ledger_state = LedgerState::new(db.clone());
        let gifts_state = GiftsState::new(db.clone(), &config);
        let payments_state = PaymentsState::new(db.clone(), provider);

        Ok(Self {
            db,
            config,
            ledger_state,
            gifts_state,
            payments_state,
        })
    }

    /// 백그라운드 워커 시작 (정산 배치 + 재조정 스윕)
    /// Start background workers (settlement batch + reconciliation sweep)
    pub fn start_workers(&self) {
        self.gifts_state
            .settlement
            .start(self.config.settle_interval);
        self.payments_state
            .reconciliation_service
            .start_sweep(self.config.reconcile_sweep_interval);
    }
}
