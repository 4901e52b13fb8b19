// Ledger Cashout Handler
// 현금화 핸들러
// 역할: 티어 자격 조회 / 현금화 요청 API 엔드포인트 처리

use crate::shared::services::AppState;
use crate::shared::errors::LedgerError;
use crate::domains::ledger::models::{
    CashoutEligibilityResponse, PayoutRequestBody, PayoutResponse,
};
use crate::domains::ledger::services::cashout::eligible_tier;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// 현금화 티어 자격 조회 핸들러
/// Get cashout tier eligibility
///
/// 경로: GET /api/ledger/cashout/{user_id}
///
/// 순수 평가: 총 잔고를 티어 테이블에 대조만 하고 아무것도 바꾸지 않음.
/// Pure evaluation over the tier table; nothing is mutated.
#[utoipa::path(
    get,
    path = "/api/ledger/cashout/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Eligibility evaluated", body = CashoutEligibilityResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Cashout"
)]
pub async fn get_cashout_eligibility(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CashoutEligibilityResponse>, (StatusCode, Json<serde_json::Value>)> {
    // 계정이 없으면 잔고 0으로 평가
    // A missing account evaluates as zero balance
    let total_balance = match app_state
        .ledger_state
        .balance_service
        .get_account(user_id)
        .await
    {
        Ok(account) => account.total(),
        Err(LedgerError::AccountNotFound { .. }) => 0,
        Err(err) => return Err(err.into()),
    };

    Ok(Json(CashoutEligibilityResponse {
        total_balance,
        eligible_tier: eligible_tier(total_balance).map(|tier| tier.to_info()),
    }))
}

/// 현금화 요청 핸들러
/// Request a payout
///
/// 경로: POST /api/ledger/payouts
///
/// 티어 자격(총 잔고 기준)을 통과하면 paid 버킷에서만 차감.
/// 신원 검증/제재 확인은 외부 협력자 몫.
/// Passes the tier gate (total balance), then debits paid only.
/// Identity/ban checks belong to external collaborators.
#[utoipa::path(
    post,
    path = "/api/ledger/payouts",
    request_body = PayoutRequestBody,
    responses(
        (status = 200, description = "Payout requested (or replayed)", body = PayoutResponse),
        (status = 400, description = "Unknown tier"),
        (status = 422, description = "Tier not reached or paid balance insufficient"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Ledger Cashout"
)]
pub async fn request_payout(
    State(app_state): State<AppState>,
    Json(req): Json<PayoutRequestBody>,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<serde_json::Value>)> {
    let response = app_state
        .ledger_state
        .operation_service
        .request_payout(&req)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(response))
}
