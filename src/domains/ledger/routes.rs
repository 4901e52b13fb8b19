use axum::{
    routing::{get, post},
    Router,
};
use crate::shared::services::AppState;

use super::handlers;

/// 원장 라우터 생성
/// Create ledger router
///
/// # Routes
///
/// ## Operations (연산)
/// - `POST /api/ledger/operations` - 연산 제출 (멱등)
/// - `POST /api/ledger/rewards/daily` - 일일 참여 리워드
///
/// ## Accounts (계정)
/// - `GET  /api/ledger/accounts/:user_id` - 잔고 조회
/// - `GET  /api/ledger/accounts/:user_id/transactions` - 거래 내역
///
/// ## Cashout (현금화)
/// - `GET  /api/ledger/cashout/:user_id` - 티어 자격 조회
/// - `POST /api/ledger/payouts` - 현금화 요청
pub fn create_ledger_router() -> Router<AppState> {
    Router::new()
        // 연산 제출
        .route("/operations", post(handlers::submit_operation))
        // 일일 리워드
        .route("/rewards/daily", post(handlers::grant_daily_reward))
        // 계정 조회
        .route("/accounts/:user_id", get(handlers::get_account))
        // 거래 내역
        .route(
            "/accounts/:user_id/transactions",
            get(handlers::get_transactions),
        )
        // 티어 자격
        .route("/cashout/:user_id", get(handlers::get_cashout_eligibility))
        // 현금화 요청
        .route("/payouts", post(handlers::request_payout))
}
