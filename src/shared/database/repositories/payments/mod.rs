// Payment repositories
pub mod coin_order_repository;
pub mod reconciliation_rejection_repository;

pub use coin_order_repository::*;
pub use reconciliation_rejection_repository::*;
