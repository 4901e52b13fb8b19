use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domains::ledger::models::{deserialize_string_to_u64, serialize_u64_as_string};

// =====================================================
// PendingGift 모델
// =====================================================
// 역할: 정산 큐의 일시적 레코드
// 설명: 선물 전송 API가 생성, 배치 프로세서가 소비
//
// 상태 머신:
// pending -> settling -> { settled | failed }
// failed(재시도 가능) -> settling -> ... -> dead_letter (시도 소진)
//
// 클레임:
// - settling 행은 claim_token으로 소유권 표시
// - claimed_at이 만료 시간을 넘기면 다음 사이클이 재클레임
// =====================================================

/// 선물 상태
/// Gift status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    /// 정산 대기
    /// Awaiting settlement
    Pending,
    /// 사이클이 클레임하여 정산 중
    /// Claimed by a cycle
    Settling,
    /// 정산 완료 (양쪽 레그 기록됨)
    /// Settled (both legs recorded)
    Settled,
    /// 실패 (사유 기록, 수신자 크레딧 없음)
    /// Failed (reason recorded, receiver not credited)
    Failed,
    /// 시도 소진, 수동 검토 대상
    /// Retry budget exhausted, manual review
    DeadLetter,
}

impl GiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiftStatus::Pending => "pending",
            GiftStatus::Settling => "settling",
            GiftStatus::Settled => "settled",
            GiftStatus::Failed => "failed",
            GiftStatus::DeadLetter => "dead_letter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GiftStatus::Pending),
            "settling" => Some(GiftStatus::Settling),
            "settled" => Some(GiftStatus::Settled),
            "failed" => Some(GiftStatus::Failed),
            "dead_letter" => Some(GiftStatus::DeadLetter),
            _ => None,
        }
    }
}

/// 정산 큐 레코드 (데이터베이스에서 조회)
/// Settlement queue record (retrieved from database)
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[schema(as = PendingGift)]
pub struct PendingGift {
    /// Gift ID (BIGSERIAL, auto-generated)
    /// 선물 ID (DB에서 자동 생성)
    #[serde(serialize_with = "serialize_u64_as_string", deserialize_with = "deserialize_string_to_u64")]
    #[schema(value_type = String, example = "77")]
    pub id: u64,

    /// 보내는 사용자
    /// Sender
    pub sender_id: Uuid,

    /// 받는 사용자
    /// Receiver
    pub receiver_id: Uuid,

    /// 선물 코드 (카탈로그 키)
    /// Gift code (catalog key)
    #[schema(example = "cash_toss")]
    pub gift_code: String,

    /// 개당 코인 비용 (접수 시점 카탈로그 가격 고정)
    /// Unit cost in coins (catalog price frozen at submission)
    #[schema(example = 100)]
    pub unit_cost: i64,

    /// 수량
    /// Quantity
    #[schema(example = 3)]
    pub quantity: i32,

    /// 상태
    /// Status
    pub status: GiftStatus,

    /// 정산 시도 횟수
    /// Settlement attempts
    pub attempts: i32,

    /// 실패 사유
    /// Failure reason
    pub fail_reason: Option<String>,

    /// 접수 시간
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,

    /// 정산 완료 시간
    /// Settlement timestamp
    pub settled_at: Option<DateTime<Utc>>,
}

impl PendingGift {
    /// 보낸 쪽 총 차감액 (unit_cost * quantity)
    /// Total sender debit (unit_cost * quantity)
    pub fn total_cost(&self) -> i64 {
        self.unit_cost * self.quantity as i64
    }
}

// =====================================================
// BatchRun 모델
// =====================================================
// 역할: 배치 프로세서 사이클당 한 건의 관측 기록
// 설명: 생성 후 읽기 전용. backlog_count로 처리 용량 부족을 감지
// =====================================================

/// 배치 사이클 기록
/// One processor cycle record
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[schema(as = BatchRun)]
pub struct BatchRun {
    /// Run ID (BIGSERIAL, auto-generated)
    #[serde(serialize_with = "serialize_u64_as_string", deserialize_with = "deserialize_string_to_u64")]
    #[schema(value_type = String, example = "15")]
    pub id: u64,

    /// 사이클 시작 시간
    /// Cycle start time
    pub run_at: DateTime<Utc>,

    /// 이번 사이클이 클레임한 건수
    /// Gifts claimed this cycle
    pub processed_count: i32,

    /// 사이클 종료 시점의 남은 pending 건수
    /// Remaining pending count at cycle end
    pub backlog_count: i64,

    /// 사이클 소요 시간 (ms)
    /// Cycle duration (ms)
    pub duration_ms: i64,

    /// 정산 실패 건수
    /// Items that did not settle
    pub error_count: i32,
}

/// 선물 전송 요청
/// Gift submission request
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = GiftRequest)]
pub struct GiftRequest {
    /// 멱등성 키
    /// Idempotency key
    pub idempotency_key: Uuid,

    /// 보내는 사용자
    /// Sender
    pub sender_id: Uuid,

    /// 받는 사용자
    /// Receiver
    pub receiver_id: Uuid,

    /// 선물 코드
    /// Gift code
    #[schema(example = "cash_toss")]
    pub gift_code: String,

    /// 수량
    /// Quantity
    #[schema(example = 1)]
    pub quantity: i32,
}

/// 선물 전송 응답 (접수만 의미, 즉시 정산 아님)
/// Gift submission response (acceptance only, not settlement)
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = GiftAcceptedResponse)]
pub struct GiftAcceptedResponse {
    /// 접수된 큐 레코드 ID
    /// Accepted queue record ID
    #[serde(serialize_with = "serialize_u64_as_string")]
    #[schema(value_type = String, example = "77")]
    pub accepted_pending_id: u64,
}

/// 선물 상태 조회 응답
/// Gift status lookup response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = GiftStatusResponse)]
pub struct GiftStatusResponse {
    /// 큐 레코드
    /// Queue record
    pub gift: PendingGift,
}

/// 배치 기록 목록 응답
/// Batch run list response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = BatchRunsResponse)]
pub struct BatchRunsResponse {
    /// 최근 사이클 기록 (최신순)
    /// Recent cycle records (newest first)
    pub runs: Vec<BatchRun>,
}
