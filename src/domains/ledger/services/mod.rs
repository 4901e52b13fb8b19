pub mod balance_service;
pub mod cashout;
pub mod idempotency_guard;
pub mod operation_service;
pub mod state;

pub use balance_service::*;
pub use cashout::*;
pub use idempotency_guard::*;
pub use operation_service::*;
pub use state::*;
