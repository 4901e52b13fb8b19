use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// =====================================================
// Account 모델
// =====================================================
// 역할: 사용자별 코인 잔고 프로젝션
// 설명: 버킷 두 개를 독립적으로 추적
//
// 버킷 구분:
// - paid_balance: 실결제로 구매한 코인 (현금 출금 대상)
// - earned_balance: 리워드/선물 수신으로 얻은 코인
//
// 불변식:
// - 두 잔고 모두 항상 >= 0
// - 잔고 = 해당 버킷 거래 delta의 합 (원장에서 재구성 가능)
// - 변경은 오직 BalanceService(Balance Mutator)를 통해서만
// =====================================================

/// 사용자 계정 잔고 (데이터베이스에서 조회한 프로젝션)
/// User account balances (projection retrieved from database)
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[schema(as = Account)]
pub struct Account {
    /// User ID (외부 인증 시스템이 발급한 안정적 식별자)
    /// User ID (stable identity issued by the external auth system)
    pub user_id: Uuid,

    /// 구매 코인 잔고 (실결제 유래)
    /// Paid-coin balance (real-money origin)
    #[schema(example = 300)]
    pub paid_balance: i64,

    /// 획득 코인 잔고 (리워드/선물 유래)
    /// Earned-coin balance (reward/gift origin)
    #[schema(example = 25)]
    pub earned_balance: i64,

    /// 계정 생성 시간 (첫 연산에서 lazy 생성)
    /// Created timestamp (lazily on first operation)
    pub created_at: DateTime<Utc>,

    /// 마지막 변경 시간
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// 총 잔고 (paid + earned)
    /// Total balance (paid + earned)
    pub fn total(&self) -> i64 {
        self.paid_balance + self.earned_balance
    }
}

/// 계정 조회 응답 모델
/// Account lookup response model
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = AccountResponse)]
pub struct AccountResponse {
    /// 계정 잔고
    /// Account balances
    pub account: Account,

    /// 총 잔고 (paid + earned)
    /// Total balance (paid + earned)
    pub total_balance: i64,
}
