/// 공유 유틸리티 모듈
/// Shared Utilities Module
///
/// 역할:
/// - 연산 지문 해싱 (멱등성 가드용)
/// - 결정적 UUID 파생 (정산/리워드 키)
pub mod fingerprint;

pub use fingerprint::*;
