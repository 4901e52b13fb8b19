use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::transaction::{serialize_u64_as_string, TransactionKind};

// =====================================================
// Operation 요청/응답 모델
// =====================================================
// 역할: 연산 API의 입출력 모델
// 설명: 모든 동기 잔고 변경은 멱등성 키를 가진 Operation Request로 들어옴
//
// 주의:
// - 인증은 외부 협력자 담당. 핸들러는 user_id를 신뢰함
// - gift_send / gift_receive는 이 API로 받지 않음 (선물 큐 경유)
// =====================================================

/// 연산 제출 요청
/// Operation submission request
#[derive(Debug, Deserialize, ToSchema, Clone)]
#[schema(as = OperationRequest)]
pub struct OperationRequest {
    /// 멱등성 키 (호출자 생성 UUID, 논리적 의도당 하나)
    /// Idempotency key (caller-generated UUID, one per logical intent)
    pub idempotency_key: Uuid,

    /// 사용자 ID
    /// User ID
    pub user_id: Uuid,

    /// 연산 종류 (purchase | spend | payout | reward | reconcile)
    /// Operation kind
    pub kind: TransactionKind,

    /// 코인 수량 (양수)
    /// Coin amount (positive)
    #[schema(example = 300)]
    pub amount: i64,

    /// 상대방 ID (수수료성 이전: spend 시 상대에게 earned 크레딧)
    /// Counterparty ID (fee-style transfer: spend credits the counterparty's earned bucket)
    pub counterparty_id: Option<Uuid>,
}

/// 연산 제출 응답
/// Operation submission response
///
/// 같은 키로 재제출하면 원래 성공 응답이 그대로 반환되고
/// duplicate = true로 표시됩니다.
/// A resubmission with the same key returns the original success
/// payload with duplicate = true.
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = OperationResponse)]
pub struct OperationResponse {
    /// 기록된 거래 ID
    /// Recorded transaction ID
    #[serde(serialize_with = "serialize_u64_as_string")]
    #[schema(value_type = String, example = "1042")]
    pub transaction_id: u64,

    /// 연산 후 총 잔고 (paid + earned)
    /// Total balance after the operation (paid + earned)
    pub new_balance: i64,

    /// 이전에 처리된 동일 연산의 재생 여부
    /// Whether this is a replay of an already-processed operation
    pub duplicate: bool,
}

/// 일일 참여 리워드 요청
/// Daily engagement reward request
///
/// 방송 시작(25코인) / 시청 참여(10코인), 하루 1회.
/// 결정적 키 파생으로 같은 날 재요청은 중복 처리됩니다.
/// Broadcast start (25 coins) / viewer join (10 coins), once per day.
/// Deterministic key derivation makes a same-day retry a duplicate.
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = DailyRewardRequest)]
pub struct DailyRewardRequest {
    /// 사용자 ID
    /// User ID
    pub user_id: Uuid,

    /// 리워드 역할 (broadcaster | viewer)
    /// Reward role
    #[schema(example = "broadcaster")]
    pub role: RewardRole,
}

/// 리워드 역할
/// Reward role
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardRole {
    Broadcaster,
    Viewer,
}

impl RewardRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardRole::Broadcaster => "broadcaster",
            RewardRole::Viewer => "viewer",
        }
    }

    /// 역할별 일일 리워드 수량
    /// Daily reward amount per role
    pub fn daily_amount(&self) -> i64 {
        match self {
            RewardRole::Broadcaster => 25,
            RewardRole::Viewer => 10,
        }
    }
}

/// 현금화 요청
/// Payout (cashout) request
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = PayoutRequestBody)]
pub struct PayoutRequestBody {
    /// 멱등성 키
    /// Idempotency key
    pub idempotency_key: Uuid,

    /// 사용자 ID
    /// User ID
    pub user_id: Uuid,

    /// 요청 티어 (basic | pro | elite | diamond)
    /// Requested tier
    #[schema(example = "basic")]
    pub tier_id: String,
}

/// 현금화 요청 응답
/// Payout request response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = PayoutResponse)]
pub struct PayoutResponse {
    /// 차감 거래 ID
    /// Debit transaction ID
    #[serde(serialize_with = "serialize_u64_as_string")]
    #[schema(value_type = String, example = "1043")]
    pub transaction_id: u64,

    /// 차감된 코인
    /// Coins debited
    pub coins: i64,

    /// 지급 예정 금액 (USD)
    /// Payout amount (USD)
    #[schema(value_type = String, example = "25.00")]
    pub usd_amount: rust_decimal::Decimal,

    /// 차감 후 총 잔고
    /// Total balance after the debit
    pub new_balance: i64,

    /// 재생 여부
    /// Replay flag
    pub duplicate: bool,
}

/// 현금화 티어 자격 응답
/// Cashout tier eligibility response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = CashoutEligibilityResponse)]
pub struct CashoutEligibilityResponse {
    /// 총 잔고
    /// Total balance
    pub total_balance: i64,

    /// 자격이 되는 최고 티어 (없으면 null)
    /// Highest qualifying tier (null if below the lowest threshold)
    pub eligible_tier: Option<CashoutTierInfo>,
}

/// 현금화 티어 정보
/// Cashout tier info
#[derive(Debug, Serialize, ToSchema, Clone)]
#[schema(as = CashoutTierInfo)]
pub struct CashoutTierInfo {
    /// 티어 ID
    /// Tier ID
    #[schema(example = "basic")]
    pub id: String,

    /// 티어 이름
    /// Tier name
    #[schema(example = "Basic")]
    pub name: String,

    /// 필요 코인
    /// Coin threshold
    #[schema(example = 12000)]
    pub coins: i64,

    /// 지급 금액 (USD)
    /// Payout amount (USD)
    #[schema(value_type = String, example = "25.00")]
    pub payout_usd: rust_decimal::Decimal,
}
