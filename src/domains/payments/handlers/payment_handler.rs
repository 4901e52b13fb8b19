// Payment Handler
// 결제 핸들러
// 역할: 주문 생성 / 웹훅 수신 / 수동 재조정 API 엔드포인트 처리

use crate::shared::services::AppState;
use crate::shared::errors::LedgerError;
use crate::domains::payments::models::{
    CreateOrderRequest, CreateOrderResponse, PaymentWebhookPayload, ReconcileOutcome,
};
use crate::domains::payments::services::verify_webhook_signature;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

/// 웹훅 서명 헤더
/// Webhook signature header
const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// 주문 생성 핸들러
/// Create a coin order
///
/// 경로: POST /api/payments/orders
///
/// 프로바이더 주문을 만들고 로컬 기록을 남김. 코인 지급은
/// 결제 완료 후 재조정 경로에서만 일어남.
/// Creates the provider order and the local record; coins are granted
/// only by the reconciliation path after payment completes.
#[utoipa::path(
    post,
    path = "/api/payments/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Unknown package"),
        (status = 502, description = "Payment provider unavailable"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payments"
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, (StatusCode, Json<serde_json::Value>)> {
    let response = app_state
        .payments_state
        .payment_service
        .create_order(&req)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(response))
}

/// 결제 완료 웹훅 핸들러
/// Payment-completed webhook
///
/// 경로: POST /api/payments/webhook
///
/// # Process
/// 1. 원문 바디에 대한 HMAC 서명 검증 (실패 시 401, 재조정 호출 없음)
/// 2. 이벤트에서 주문 참조 추출
/// 3. 재조정 호출 (중복 전달은 AlreadyCredited)
///
/// 처리 불가능한 이벤트 종류는 200으로 수용함 (프로바이더 재전송 방지).
/// Unhandled event types are acknowledged with 200 so the provider
/// stops redelivering them.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body = PaymentWebhookPayload,
    responses(
        (status = 200, description = "Event processed or acknowledged", body = ReconcileOutcome),
        (status = 401, description = "Invalid signature"),
        (status = 502, description = "Payment provider unavailable"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    // 서명 검증이 재조정 호출보다 먼저
    // Signature check comes before any reconciliation
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_webhook_signature(&app_state.config.webhook_secret, &body, signature) {
        return Err(LedgerError::InvalidSignature.into());
    }

    let payload: PaymentWebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("Invalid webhook payload: {e}") })),
        )
    })?;

    if payload.event_type != "PAYMENT.CAPTURE.COMPLETED" {
        return Ok(Json(serde_json::json!({
            "ok": true,
            "handled": "ignored",
            "event_type": payload.event_type,
        })));
    }

    let Some(order_id) = payload.resource.order_id.as_deref() else {
        return Ok(Json(serde_json::json!({
            "ok": true,
            "handled": "missing_order_id",
        })));
    };

    let outcome = app_state
        .payments_state
        .reconciliation_service
        .reconcile(order_id)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(serde_json::json!({ "ok": true, "result": outcome })))
}

/// 수동 재조정 핸들러 (운영/스윕 보조 진입점)
/// Manual reconciliation (operator/sweep auxiliary entry)
///
/// 경로: POST /api/payments/reconcile/{provider_order_id}
#[utoipa::path(
    post,
    path = "/api/payments/reconcile/{provider_order_id}",
    params(
        ("provider_order_id" = String, Path, description = "Provider order ID")
    ),
    responses(
        (status = 200, description = "Reconciliation outcome", body = ReconcileOutcome),
        (status = 502, description = "Payment provider unavailable"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payments"
)]
pub async fn reconcile_order(
    State(app_state): State<AppState>,
    Path(provider_order_id): Path<String>,
) -> Result<Json<ReconcileOutcome>, (StatusCode, Json<serde_json::Value>)> {
    let outcome = app_state
        .payments_state
        .reconciliation_service
        .reconcile(&provider_order_id)
        .await
        .map_err(<(StatusCode, Json<serde_json::Value>)>::from)?;

    Ok(Json(outcome))
}
