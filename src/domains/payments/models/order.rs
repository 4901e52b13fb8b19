use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domains::ledger::models::{deserialize_string_to_u64, serialize_u64_as_string};

// =====================================================
// CoinOrder 모델
// =====================================================
// 역할: 결제 프로바이더 체크아웃의 로컬 주문 기록
// 설명: 주문 생성 시 기록, 재조정이 완결 처리
//
// 상태:
// - created: 프로바이더 주문 생성됨, 아직 크레딧 없음
// - completed: 재조정이 코인을 지급함
// - rejected: 영구 불일치 (운영자 큐 참조)
// =====================================================

/// 주문 상태
/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Completed,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(OrderStatus::Created),
            "completed" => Some(OrderStatus::Completed),
            "rejected" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }
}

/// 로컬 주문 기록 (데이터베이스에서 조회)
/// Local order record (retrieved from database)
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[schema(as = CoinOrder)]
pub struct CoinOrder {
    /// Order ID (BIGSERIAL, auto-generated)
    #[serde(serialize_with = "serialize_u64_as_string", deserialize_with = "deserialize_string_to_u64")]
    #[schema(value_type = String, example = "12")]
    pub id: u64,

    /// 구매자
    /// Buyer
    pub user_id: Uuid,

    /// 패키지 ID
    /// Package ID
    #[schema(example = "pkg-300")]
    pub package_id: String,

    /// 지급 예정 코인
    /// Coins to grant
    pub coins: i64,

    /// 주문 금액 (USD)
    /// Order amount (USD)
    #[schema(value_type = String, example = "1.99")]
    pub usd_amount: Decimal,

    /// 프로바이더 주문 ID
    /// Provider order ID
    pub provider_order_id: Option<String>,

    /// 상태
    /// Status
    pub status: OrderStatus,

    /// 생성 시간
    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// 마지막 변경 시간
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// 주문 생성 요청
/// Order creation request
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = CreateOrderRequest)]
pub struct CreateOrderRequest {
    /// 구매자
    /// Buyer
    pub user_id: Uuid,

    /// 패키지 ID
    /// Package ID
    #[schema(example = "pkg-300")]
    pub package_id: String,
}

/// 주문 생성 응답
/// Order creation response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = CreateOrderResponse)]
pub struct CreateOrderResponse {
    /// 로컬 주문 ID
    /// Local order ID
    #[serde(serialize_with = "serialize_u64_as_string")]
    #[schema(value_type = String, example = "12")]
    pub order_id: u64,

    /// 프로바이더 주문 ID (클라이언트가 승인 플로우에 사용)
    /// Provider order ID (used by the client approval flow)
    pub provider_order_id: String,
}

/// 재조정 결과
/// Reconciliation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReconcileOutcome {
    /// 코인 지급 완료
    /// Coins credited
    Credited {
        #[serde(serialize_with = "serialize_u64_as_string")]
        #[schema(value_type = String)]
        transaction_id: u64,
        coins: i64,
    },
    /// 이미 지급됨 (멱등 no-op)
    /// Already credited (idempotent no-op)
    AlreadyCredited,
    /// 거부됨 (사유 포함)
    /// Rejected with a reason
    Rejected { reason: String },
}

/// 웹훅 페이로드 (프로바이더 이벤트)
/// Webhook payload (provider event)
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = PaymentWebhookPayload)]
pub struct PaymentWebhookPayload {
    /// 이벤트 종류 (예: PAYMENT.CAPTURE.COMPLETED)
    /// Event type
    pub event_type: String,

    /// 이벤트 리소스
    /// Event resource
    pub resource: WebhookResource,
}

/// 웹훅 리소스 (주문 참조 추출용)
/// Webhook resource (order reference extraction)
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = WebhookResource)]
pub struct WebhookResource {
    /// 프로바이더 주문 ID
    /// Provider order ID
    pub order_id: Option<String>,

    /// 리소스 자체 ID (캡처 ID 등)
    /// Resource's own id (capture id etc.)
    pub id: Option<String>,
}
