// Payments domain
// 결제 도메인: 주문 생성 + 웹훅 + 재조정
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
