// Ledger Operation Handler
// 원장 연산 핸들러
// 역할: 연산 제출 / 일일 리워드 API 엔드포인트 처리

use crate::shared::services::AppState;
use crate::domains::ledger::models::{DailyRewardRequest, OperationRequest, OperationResponse};
use axum::{extract::State, http::StatusCode, Json};

/// 연산 제출 핸들러
/// Submit an operation
///
/// 경로: POST /api/ledger/operations
/// 인증: 외부 협력자 담당 (user_id 신뢰)
///
/// # Returns
/// * `200 OK` - 거래 ID와 새 잔고 (재생이면 duplicate = true)
/// * `400 Bad Request` - 잘못된 종류/수량/상대방
/// * `409 Conflict` - 같은 키가 다른 파라미터로 재사용됨
/// * `422 Unprocessable Entity` - 잔고 부족
#[utoipa::path(
    post,
    path = "/api/ledger/operations",
    request_body = OperationRequest,
    responses(
        (status = 200, description = "Operation applied (or replayed)", body = OperationResponse),
        (status = 400, description = "Invalid kind, amount, or counterparty"),
        (status = 409, description = "Idempotency key reused with different parameters"),
        (status = 422, description = "Insufficient funds"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Operations"
)]
pub async fn submit_operation(
    State(app_state): State<AppState>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, (StatusCode, Json<serde_json::Value>)> {
    let response = app_state
        .ledger_state
        .operation_service
        .submit(&req)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(response))
}

/// 일일 참여 리워드 핸들러
/// Grant the daily engagement reward
///
/// 경로: POST /api/ledger/rewards/daily
///
/// 같은 (사용자, 역할, 날짜)의 재요청은 duplicate 응답을 받음.
/// A same-day retry for (user, role) receives the duplicate payload.
#[utoipa::path(
    post,
    path = "/api/ledger/rewards/daily",
    request_body = DailyRewardRequest,
    responses(
        (status = 200, description = "Reward granted (or replayed)", body = OperationResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Operations"
)]
pub async fn grant_daily_reward(
    State(app_state): State<AppState>,
    Json(req): Json<DailyRewardRequest>,
) -> Result<Json<OperationResponse>, (StatusCode, Json<serde_json::Value>)> {
    let response = app_state
        .ledger_state
        .operation_service
        .grant_daily_reward(req.user_id, req.role)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(response))
}
