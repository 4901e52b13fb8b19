use serde::{Deserialize, Serialize, Deserializer, Serializer};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// =====================================================
// ID 직렬화 헬퍼 함수 (JavaScript 정밀도 손실 방지)
// =====================================================
/// u64를 문자열로 직렬화 (JavaScript 정밀도 손실 방지)
/// Serialize u64 as string to avoid precision loss in JavaScript
pub fn serialize_u64_as_string<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// 문자열을 u64로 역직렬화
/// Deserialize string to u64
pub fn deserialize_string_to_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<u64>().map_err(serde::de::Error::custom)
}

// =====================================================
// Transaction 모델
// =====================================================
// 역할: 불변 append-only 거래 기록
// 설명: 잔고 변경 한 건당 한 행, 수정/삭제 금지 (정정은 상쇄 거래 추가)
//
// 버킷:
// - paid: 실결제 유래 코인
// - earned: 리워드/선물 유래 코인
//
// 종류:
// - purchase: 코인 구매 (paid 크레딧)
// - gift_send / gift_receive: 선물 정산의 양쪽 레그
// - spend: 일반 소비 (earned 우선 차감)
// - payout: 현금화 (paid 전용 차감)
// - reward: 플랫폼 리워드 (earned 크레딧)
// - reconcile: 운영자 정정 크레딧
// =====================================================

/// 잔고 버킷
/// Balance bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// 구매 코인
    /// Paid coins
    Paid,
    /// 획득 코인
    /// Earned coins
    Earned,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Paid => "paid",
            Bucket::Earned => "earned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(Bucket::Paid),
            "earned" => Some(Bucket::Earned),
            _ => None,
        }
    }
}

/// 거래 종류
/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    GiftSend,
    GiftReceive,
    Spend,
    Payout,
    Reward,
    Reconcile,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::GiftSend => "gift_send",
            TransactionKind::GiftReceive => "gift_receive",
            TransactionKind::Spend => "spend",
            TransactionKind::Payout => "payout",
            TransactionKind::Reward => "reward",
            TransactionKind::Reconcile => "reconcile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(TransactionKind::Purchase),
            "gift_send" => Some(TransactionKind::GiftSend),
            "gift_receive" => Some(TransactionKind::GiftReceive),
            "spend" => Some(TransactionKind::Spend),
            "payout" => Some(TransactionKind::Payout),
            "reward" => Some(TransactionKind::Reward),
            "reconcile" => Some(TransactionKind::Reconcile),
            _ => None,
        }
    }
}

/// 거래 기록 (데이터베이스에서 조회한 원장 행)
/// Transaction record (ledger row retrieved from database)
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[schema(as = Transaction)]
pub struct Transaction {
    /// Transaction ID (BIGSERIAL, auto-generated)
    /// 거래 ID (DB에서 자동 생성)
    /// Serialized as string to avoid precision loss in JavaScript
    /// JavaScript 정밀도 손실 방지를 위해 문자열로 직렬화
    #[serde(serialize_with = "serialize_u64_as_string", deserialize_with = "deserialize_string_to_u64")]
    #[schema(value_type = String, example = "1042")]
    pub id: u64,

    /// 사용자 ID (이 거래가 속한 계정)
    /// User ID (account this row belongs to)
    pub user_id: Uuid,

    /// 상대방 ID (P2P 선물에서만 설정)
    /// Counterparty ID (set for peer-to-peer gifts)
    pub counterparty_id: Option<Uuid>,

    /// 잔고 버킷
    /// Balance bucket
    pub bucket: Bucket,

    /// 변화량 (음수 = 차감)
    /// Signed delta (negative = debit)
    #[schema(example = -100)]
    pub delta: i64,

    /// 거래 종류
    /// Transaction kind
    pub kind: TransactionKind,

    /// 멱등성 키 (시스템 내부 리워드에서만 null 허용)
    /// Idempotency key (null only for system-internal rewards)
    pub idempotency_key: Option<Uuid>,

    /// 외부 결제 참조 (프로바이더 주문 ID)
    /// External payment reference (provider order id)
    pub external_ref: Option<String>,

    /// 기록 시간
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// 거래 내역 응답 모델
/// Transaction history response model
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = TransactionsResponse)]
pub struct TransactionsResponse {
    /// 거래 목록 (최신순)
    /// Transactions (newest first)
    pub transactions: Vec<Transaction>,
}
