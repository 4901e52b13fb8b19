use rust_decimal::Decimal;

use crate::domains::ledger::models::CashoutTierInfo;

// =====================================================
// 현금화 티어 평가
// =====================================================
// 역할: 총 잔고를 자격이 되는 최고 티어로 사상하는 순수 함수
// 설명: 표시용 자격 조회와 현금화 요청 게이트 양쪽에서 사용
// (신원 검증/제재 상태는 외부 협력자 확인 사항)
// =====================================================

/// 현금화 티어 (정적 참조 데이터)
/// Cashout tier (static reference data)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashoutTier {
    pub id: &'static str,
    pub name: &'static str,
    /// 필요 코인 (threshold)
    /// Coin threshold
    pub coins: i64,
    /// 지급 금액 (USD 센트)
    /// Payout amount (USD cents)
    pub payout_usd_cents: i64,
}

impl CashoutTier {
    pub fn payout_usd(&self) -> Decimal {
        Decimal::new(self.payout_usd_cents, 2)
    }

    pub fn to_info(&self) -> CashoutTierInfo {
        CashoutTierInfo {
            id: self.id.to_string(),
            name: self.name.to_string(),
            coins: self.coins,
            payout_usd: self.payout_usd(),
        }
    }
}

/// 현금화 티어 목록 (threshold 오름차순)
/// Cashout tiers (ascending by threshold)
pub const CASHOUT_TIERS: &[CashoutTier] = &[
    CashoutTier { id: "basic", name: "Basic", coins: 12_000, payout_usd_cents: 2_500 },
    CashoutTier { id: "pro", name: "Pro", coins: 26_375, payout_usd_cents: 7_000 },
    CashoutTier { id: "elite", name: "Elite", coins: 60_000, payout_usd_cents: 15_000 },
    CashoutTier { id: "diamond", name: "Diamond", coins: 120_000, payout_usd_cents: 35_500 },
];

/// 자격이 되는 최고 티어 반환
/// Return the highest qualifying tier
///
/// threshold <= total_balance인 티어 중 가장 높은 것.
/// 최저 threshold 미만이면 None.
/// Highest tier whose threshold <= total_balance, or None below
/// the lowest threshold.
pub fn eligible_tier(total_balance: i64) -> Option<&'static CashoutTier> {
    CASHOUT_TIERS
        .iter()
        .rev()
        .find(|tier| total_balance >= tier.coins)
}

/// ID로 티어 찾기
/// Find a tier by id
pub fn find_tier(tier_id: &str) -> Option<&'static CashoutTier> {
    CASHOUT_TIERS.iter().find(|tier| tier.id == tier_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_lowest_threshold() {
        assert!(eligible_tier(0).is_none());
        assert!(eligible_tier(11_999).is_none());
    }

    #[test]
    fn test_exact_threshold_is_eligible() {
        let tier = eligible_tier(12_000).expect("12000 reaches basic");
        assert_eq!(tier.id, "basic");
    }

    #[test]
    fn test_mid_range_returns_highest_reached() {
        let tier = eligible_tier(26_375).expect("26375 reaches pro");
        assert_eq!(tier.id, "pro");

        // pro와 elite 사이 값은 여전히 pro
        // Between pro and elite still maps to pro
        let tier = eligible_tier(59_999).expect("59999 reaches pro");
        assert_eq!(tier.id, "pro");
    }

    #[test]
    fn test_top_tier() {
        let tier = eligible_tier(120_000).expect("120000 reaches diamond");
        assert_eq!(tier.id, "diamond");

        let tier = eligible_tier(5_000_000).expect("large balance reaches diamond");
        assert_eq!(tier.id, "diamond");
    }

    #[test]
    fn test_tiers_are_ascending() {
        for pair in CASHOUT_TIERS.windows(2) {
            assert!(pair[0].coins < pair[1].coins);
        }
    }

    #[test]
    fn test_payout_amounts() {
        assert_eq!(find_tier("basic").unwrap().payout_usd(), Decimal::new(2_500, 2));
        assert_eq!(find_tier("diamond").unwrap().payout_usd(), Decimal::new(35_500, 2));
        assert!(find_tier("platinum").is_none());
    }
}
