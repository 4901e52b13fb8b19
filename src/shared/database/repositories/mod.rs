// All repositories module
pub mod gifts;
pub mod ledger;
pub mod payments;

// Re-export all repositories for convenience
pub use gifts::*;
pub use ledger::*;
pub use payments::*;
