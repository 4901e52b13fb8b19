// Gift Handler
// 선물 핸들러
// 역할: 선물 접수 / 상태 조회 / 배치 기록 API 엔드포인트 처리

use crate::shared::services::AppState;
use crate::shared::errors::LedgerError;
use crate::shared::database::BatchRunRepository;
use crate::domains::gifts::models::{
    BatchRunsResponse, GiftAcceptedResponse, GiftRequest, GiftStatusResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// 배치 기록 조회 쿼리
/// Batch run query
#[derive(Debug, Deserialize, IntoParams)]
pub struct BatchRunsQuery {
    /// 최대 조회 개수 (기본 50, 최대 1000)
    /// Max rows (default 50, max 1000)
    pub limit: Option<i64>,
}

/// 선물 접수 핸들러
/// Submit a gift
///
/// 경로: POST /api/gifts
///
/// 접수만 의미함: 정산은 배치 프로세서가 비동기로 수행.
/// 잔고 사전 확인에 실패하면 즉시 422로 거절됨.
/// Acceptance only; settlement happens asynchronously in the batch
/// processor. A failed balance pre-check rejects with 422 right away.
#[utoipa::path(
    post,
    path = "/api/gifts",
    request_body = GiftRequest,
    responses(
        (status = 200, description = "Gift accepted into the settlement queue", body = GiftAcceptedResponse),
        (status = 400, description = "Unknown gift code or invalid quantity"),
        (status = 409, description = "Idempotency key reused with different parameters"),
        (status = 422, description = "Insufficient balance at pre-check"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Gifts"
)]
pub async fn submit_gift(
    State(app_state): State<AppState>,
    Json(req): Json<GiftRequest>,
) -> Result<Json<GiftAcceptedResponse>, (StatusCode, Json<serde_json::Value>)> {
    let accepted_pending_id = app_state
        .gifts_state
        .gift_service
        .submit(&req)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(GiftAcceptedResponse { accepted_pending_id }))
}

/// 선물 상태 조회 핸들러
/// Get gift status
///
/// 경로: GET /api/gifts/{id}
///
/// 정산 시점 실패는 여기서 failed 상태와 사유로 드러남
/// (조용한 유실 없음).
/// Settlement-time failures surface here as status=failed with a
/// reason (no silent loss).
#[utoipa::path(
    get,
    path = "/api/gifts/{id}",
    params(
        ("id" = u64, Path, description = "Pending gift ID")
    ),
    responses(
        (status = 200, description = "Gift status retrieved", body = GiftStatusResponse),
        (status = 404, description = "Gift not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Gifts"
)]
pub async fn get_gift(
    State(app_state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<GiftStatusResponse>, (StatusCode, Json<serde_json::Value>)> {
    let gift = app_state
        .gifts_state
        .gift_service
        .get(id)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(GiftStatusResponse { gift }))
}

/// 배치 기록 조회 핸들러
/// List batch runs
///
/// 경로: GET /api/gifts/runs
///
/// backlog_count 추이로 처리 용량 부족을 감지하는 관측 표면.
/// Observability surface; a growing backlog_count signals
/// under-provisioned processing capacity.
#[utoipa::path(
    get,
    path = "/api/gifts/runs",
    params(BatchRunsQuery),
    responses(
        (status = 200, description = "Batch runs retrieved", body = BatchRunsResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Gifts"
)]
pub async fn list_batch_runs(
    State(app_state): State<AppState>,
    Query(query): Query<BatchRunsQuery>,
) -> Result<Json<BatchRunsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let repo = BatchRunRepository::new(app_state.db.pool().clone());

    let runs = repo
        .list_recent(query.limit)
        .await
        .map_err(|e| <(StatusCode, Json<serde_json::Value>)>::from(LedgerError::database(e)))?;

    Ok(Json(BatchRunsResponse { runs }))
}
