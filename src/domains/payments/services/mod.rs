pub mod payment_service;
pub mod reconciliation_service;
pub mod state;

pub use payment_service::*;
pub use reconciliation_service::*;
pub use state::*;
