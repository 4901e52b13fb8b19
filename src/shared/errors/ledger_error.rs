use thiserror::Error;
use axum::{http::StatusCode, Json};
use serde_json::json;
use uuid::Uuid;

/// 원장 관련 에러
/// Ledger-related errors
///
/// 전파 정책:
/// - InsufficientFunds / InvalidBucket: 호출자에게 동기 반환, 자동 재시도 금지
/// - 멱등 중복은 에러가 아님 (원래 성공 페이로드를 그대로 반환)
/// - ExternalProviderUnavailable: 일시적, 호출자/스윕이 재시도
/// - AmountMismatch: 영구적, 운영자 큐로 이동
/// Propagation policy:
/// - InsufficientFunds / InvalidBucket: returned synchronously, never auto-retried
/// - Idempotent duplicates are not errors (the original payload is returned)
/// - ExternalProviderUnavailable: transient, caller/sweep retries
/// - AmountMismatch: permanent, routed to the operator queue
#[derive(Error, Debug)]
pub enum LedgerError {
    /// 잔고 부족
    /// Insufficient funds for a debit
    #[error("Insufficient funds: required={required}, available={available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// 연산 종류와 버킷이 맞지 않음
    /// Operation kind not allowed to touch this bucket
    #[error("Invalid bucket '{bucket}' for operation kind '{kind}'")]
    InvalidBucket { kind: String, bucket: String },

    /// 같은 키로 다른 파라미터 제출 (호출자 오류, fail closed)
    /// Same key reused with different parameters (caller error, fails closed)
    #[error("Idempotency conflict: key {key} was used with different parameters")]
    IdempotencyConflict { key: Uuid },

    /// 같은 키의 선행 요청이 아직 진행 중
    /// An earlier request with this key is still in flight
    #[error("Operation with key {key} is still in flight")]
    OperationInFlight { key: Uuid },

    /// 계정 없음
    /// Account not found
    #[error("Account not found: user={user_id}")]
    AccountNotFound { user_id: Uuid },

    /// 금액이 0 이하
    /// Non-positive amount
    #[error("Invalid amount: {amount} (must be positive)")]
    InvalidAmount { amount: i64 },

    /// 연산 API로 제출할 수 없는 종류 (선물은 선물 큐로)
    /// Kind not accepted by the operation API (gifts go through the gift queue)
    #[error("Operation kind '{kind}' is not accepted here")]
    UnsupportedKind { kind: String },

    /// 자기 자신을 상대방으로 지정
    /// Counterparty is the caller themselves
    #[error("Counterparty must differ from the acting user")]
    InvalidCounterparty,

    /// 카탈로그에 없는 선물 코드
    /// Gift code not in the catalog
    #[error("Unknown gift code: {code}")]
    UnknownGiftCode { code: String },

    /// 접수 레코드 없음
    /// Pending gift not found
    #[error("Pending gift not found: id={id}")]
    GiftNotFound { id: u64 },

    /// 카탈로그에 없는 코인 패키지
    /// Coin package not in the catalog
    #[error("Unknown coin package: {package_id}")]
    UnknownPackage { package_id: String },

    /// 존재하지 않는 현금화 티어
    /// No such cashout tier
    #[error("Unknown cashout tier: {tier_id}")]
    UnknownTier { tier_id: String },

    /// 요청 티어 미달
    /// Requested cashout tier not reached
    #[error("Cashout tier '{tier_id}' requires {required} coins, balance is {balance}")]
    TierNotEligible { tier_id: String, required: i64, balance: i64 },

    /// 결제 금액 불일치 (영구 실패, 운영자 검토 필요)
    /// Captured amount differs from the catalog price (permanent, operator review)
    #[error("Amount mismatch: expected {expected}, provider reported {actual}")]
    AmountMismatch { expected: String, actual: String },

    /// 외부 결제 프로바이더 일시 장애
    /// Transient payment provider failure
    #[error("External payment provider unavailable: {0}")]
    ExternalProviderUnavailable(String),

    /// 웹훅 서명 불일치
    /// Webhook signature verification failed
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// 데이터베이스 에러
    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// anyhow 에러를 Database 변형으로 감싸기
    /// Wrap an anyhow error as the Database variant
    pub fn database(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// LedgerError를 HTTP 응답으로 변환
/// Convert LedgerError into an HTTP response
impl From<LedgerError> for (StatusCode, Json<serde_json::Value>) {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::InvalidBucket { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::IdempotencyConflict { .. } => StatusCode::CONFLICT,
            LedgerError::OperationInFlight { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::AccountNotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
            LedgerError::UnsupportedKind { .. } => StatusCode::BAD_REQUEST,
            LedgerError::InvalidCounterparty => StatusCode::BAD_REQUEST,
            LedgerError::UnknownGiftCode { .. } => StatusCode::BAD_REQUEST,
            LedgerError::GiftNotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::UnknownPackage { .. } => StatusCode::BAD_REQUEST,
            LedgerError::UnknownTier { .. } => StatusCode::BAD_REQUEST,
            LedgerError::TierNotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::ExternalProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            LedgerError::InvalidSignature => StatusCode::UNAUTHORIZED,
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": err.to_string() })))
    }
}

/// Postgres unique 제약 위반 여부 확인 (SQLSTATE 23505)
/// Check for a Postgres unique violation (SQLSTATE 23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
