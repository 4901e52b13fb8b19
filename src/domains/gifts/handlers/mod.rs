pub mod gift_handler;

pub use gift_handler::*;
