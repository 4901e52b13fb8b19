// ledger_server 라이브러리 루트
// 통합 테스트가 서비스 계층을 직접 구동할 수 있도록 모듈을 공개
// Library root; integration tests drive the service layer directly
pub mod domains;
pub mod routes;
pub mod shared;
