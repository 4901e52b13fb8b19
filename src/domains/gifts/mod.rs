// Gifts domain
// 선물 도메인: 접수 큐 + 배치 정산
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
