pub mod client;
pub mod retry;

pub use client::{ChainQuery, EvmRpcClient};
pub use retry::RetryPolicy;
