use axum::{routing::post, Router};
use crate::shared::services::AppState;

use super::handlers;

/// 결제 라우터 생성
/// Create payments router
///
/// # Routes
/// - `POST /api/payments/orders` - 코인 주문 생성
/// - `POST /api/payments/webhook` - 결제 완료 웹훅 (서명 필수)
/// - `POST /api/payments/reconcile/:provider_order_id` - 수동 재조정
pub fn create_payments_router() -> Router<AppState> {
    Router::new()
        // 주문 생성
        .route("/orders", post(handlers::create_order))
        // 결제 완료 웹훅
        .route("/webhook", post(handlers::payment_webhook))
        // 수동 재조정
        .route(
            "/reconcile/:provider_order_id",
            post(handlers::reconcile_order),
        )
}
