pub mod account;
pub mod operation;
pub mod transaction;

pub use account::*;
pub use operation::*;
pub use transaction::*;
