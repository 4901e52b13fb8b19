// Ledger Balance Handler
// 원장 잔고 핸들러
// 역할: 계정/거래 내역 조회 API 엔드포인트 처리

use crate::shared::services::AppState;
use crate::domains::ledger::models::{AccountResponse, TransactionsResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

/// 거래 내역 조회 쿼리
/// Transaction history query
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionsQuery {
    /// 최대 조회 개수 (기본 50, 최대 1000)
    /// Max rows (default 50, max 1000)
    pub limit: Option<i64>,
}

/// 계정 잔고 조회 핸들러
/// Get account balances
///
/// 경로: GET /api/ledger/accounts/{user_id}
///
/// # Returns
/// * `200 OK` - 잔고 프로젝션
/// * `404 Not Found` - 아직 연산이 없는 사용자
#[utoipa::path(
    get,
    path = "/api/ledger/accounts/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account retrieved successfully", body = AccountResponse),
        (status = 404, description = "Account not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Accounts"
)]
pub async fn get_account(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<serde_json::Value>)> {
    let account = app_state
        .ledger_state
        .balance_service
        .get_account(user_id)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    let total_balance = account.total();
    Ok(Json(AccountResponse {
        account,
        total_balance,
    }))
}

/// 거래 내역 조회 핸들러
/// Get a user's transaction history
///
/// 경로: GET /api/ledger/accounts/{user_id}/transactions
#[utoipa::path(
    get,
    path = "/api/ledger/accounts/{user_id}/transactions",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        TransactionsQuery
    ),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = TransactionsResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Accounts"
)]
pub async fn get_transactions(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let transactions = app_state
        .ledger_state
        .operation_service
        .list_transactions(user_id, query.limit)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(TransactionsResponse { transactions }))
}
