// External clients
pub mod mock;
pub mod paypal;

pub use mock::*;
pub use paypal::*;
