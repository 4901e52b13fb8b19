// Ledger repositories
pub mod account_repository;
pub mod idempotency_repository;
pub mod payout_request_repository;
pub mod transaction_repository;

pub use account_repository::*;
pub use idempotency_repository::*;
pub use payout_request_repository::*;
pub use transaction_repository::*;
