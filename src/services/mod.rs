// All service modules
pub mod balance_checker;
pub mod check_runs;
pub mod report;
pub mod targets;
pub mod wallet_files;

// Re-export for convenience
pub use balance_checker::{BalanceChecker, CheckRequest};
pub use check_runs::CheckRunManager;
pub use targets::TargetList;
