// Routes module: 라우팅 설정
// 역할: 모든 도메인의 라우터를 조합
// Routes module: combines all domain routers

use axum::Router;
use crate::shared::services::AppState;

// 각 도메인의 routes import
use crate::domains::gifts::routes::create_gifts_router;
use crate::domains::ledger::routes::create_ledger_router;
use crate::domains::payments::routes::create_payments_router;

/// Create main router (combines all domain routers)
/// 메인 라우터 생성 (모든 도메인 라우터 조합)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/api/ledger", create_ledger_router())
        .nest("/api/gifts", create_gifts_router())
        .nest("/api/payments", create_payments_router())
}
