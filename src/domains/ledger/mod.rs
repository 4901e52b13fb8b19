// Ledger domain
// 원장 도메인: 계정/거래/멱등성/캐시아웃
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
