// Gift repositories
pub mod batch_run_repository;
pub mod pending_gift_repository;

pub use batch_run_repository::*;
pub use pending_gift_repository::*;
