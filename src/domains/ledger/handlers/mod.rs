pub mod balance_handler;
pub mod cashout_handler;
pub mod operation_handler;

pub use balance_handler::*;
pub use cashout_handler::*;
pub use operation_handler::*;
