use axum::{
    routing::{get, post},
    Router,
};
use crate::shared::services::AppState;

use super::handlers;

/// 선물 라우터 생성
/// Create gifts router
///
/// # Routes
/// - `POST /api/gifts` - 선물 접수 (큐 삽입)
/// - `GET  /api/gifts/runs` - 배치 사이클 기록
/// - `GET  /api/gifts/:id` - 접수 상태 조회
pub fn create_gifts_router() -> Router<AppState> {
    Router::new()
        // 선물 접수
        .route("/", post(handlers::submit_gift))
        // 배치 기록 (주의: /runs가 /:id보다 먼저 와야 함!)
        .route("/runs", get(handlers::list_batch_runs))
        // 접수 상태 조회
        .route("/:id", get(handlers::get_gift))
}
