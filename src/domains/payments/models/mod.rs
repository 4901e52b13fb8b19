pub mod order;
pub mod package;

pub use order::*;
pub use package::*;
