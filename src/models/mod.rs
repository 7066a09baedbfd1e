// src/models/mod.rs
pub mod check;
pub mod response;
pub mod rpc_config;
pub mod wallet;
pub mod wallet_file;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use check::{
    BalanceResult, ChainCheck, CheckMode, CheckRecord, ExecutionStrategy, Lookup, ProgressState,
    RunStatus, UsageStatus, Wei,
};
pub use response::{ApiResponse, PaginatedResponse};
pub use rpc_config::{RpcConfig, RpcConfigDraft};
pub use wallet::{is_valid_evm_address, Wallet};
pub use wallet_file::{WalletFile, WalletFileSummary, WalletFileType};
