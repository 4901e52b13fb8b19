use sha2::{Digest, Sha256};
use uuid::Uuid;

/// 파생 키 네임스페이스 (정산 레그, 일일 리워드 등 결정적 UUID 생성용)
/// Namespace for derived keys (settlement legs, daily rewards)
pub const LEDGER_KEY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x7c, 0x2a, 0x91, 0x4e, 0x0b, 0x6d, 0x4f, 0x3a,
    0x9e, 0x51, 0xc8, 0x37, 0x2d, 0x84, 0xa1, 0x65,
]);

/// 연산 지문 생성
/// Build an operation fingerprint
///
/// 같은 키로 재제출된 요청이 원래 요청과 의미상 동일한지 판별하는 데 사용.
/// 정규화된 파라미터 문자열의 SHA-256을 16진수로 반환합니다.
/// Used to detect whether a resubmitted request is semantically identical
/// to the original. Returns hex SHA-256 of the canonical parameter string.
///
/// # Arguments
/// * `user_id` - 사용자 ID
/// * `kind` - 연산 종류 (예: "purchase")
/// * `amount` - 코인 수량
/// * `counterparty_id` - 상대방 (P2P 연산에서만)
pub fn operation_fingerprint(
    user_id: Uuid,
    kind: &str,
    amount: i64,
    counterparty_id: Option<Uuid>,
) -> String {
    let canonical = match counterparty_id {
        Some(cp) => format!("{user_id}:{kind}:{amount}:{cp}"),
        None => format!("{user_id}:{kind}:{amount}:-"),
    };

    let digest = Sha256::digest(canonical.as_bytes());
    hex_encode(digest.as_slice())
}

/// 결정적 파생 키 생성 (UUIDv5)
/// Derive a deterministic key (UUIDv5)
///
/// 선물 정산 레그처럼 같은 입력이면 항상 같은 키가 나와야 하는 곳에 사용.
/// Used where the same input must always yield the same key,
/// e.g. gift settlement legs.
pub fn derived_key(name: &str) -> Uuid {
    Uuid::new_v5(&LEDGER_KEY_NAMESPACE, name.as_bytes())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let user = Uuid::new_v4();
        let a = operation_fingerprint(user, "purchase", 300, None);
        let b = operation_fingerprint(user, "purchase", 300, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex SHA-256
    }

    #[test]
    fn test_fingerprint_differs_on_any_parameter() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let base = operation_fingerprint(user, "purchase", 300, None);

        assert_ne!(base, operation_fingerprint(other, "purchase", 300, None));
        assert_ne!(base, operation_fingerprint(user, "spend", 300, None));
        assert_ne!(base, operation_fingerprint(user, "purchase", 301, None));
        assert_ne!(base, operation_fingerprint(user, "purchase", 300, Some(other)));
    }

    #[test]
    fn test_derived_key_is_stable() {
        assert_eq!(derived_key("gift:42:debit"), derived_key("gift:42:debit"));
        assert_ne!(derived_key("gift:42:debit"), derived_key("gift:42:credit"));
        assert_ne!(derived_key("gift:42:debit"), derived_key("gift:43:debit"));
    }
}
