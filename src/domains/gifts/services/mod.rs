pub mod gift_service;
pub mod settlement;
pub mod state;

pub use gift_service::*;
pub use settlement::*;
pub use state::*;
