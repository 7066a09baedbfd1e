/// Application constants

// API version
pub const API_VERSION: &str = "v1";

// RPC querying
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RPC_BACKOFF_BASE_MS: u64 = 1000;
pub const JSONRPC_VERSION: &str = "2.0";
pub const JSONRPC_REQUEST_ID: u64 = 1;
pub const METHOD_GET_BALANCE: &str = "eth_getBalance";
pub const METHOD_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
pub const BLOCK_TAG_LATEST: &str = "latest";

// Batch orchestration
pub const DEFAULT_BATCH_DELAY_MS: u64 = 50;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const MAX_WORKER_COUNT: usize = 64;

// Balance formatting
pub const NATIVE_DECIMALS: u32 = 18;
pub const DISPLAY_FRACTION_DIGITS: usize = 6;
pub const UNKNOWN_CHAIN_SYMBOL: &str = "TOKEN";

// Results / persistence
pub const DEFAULT_RESULTS_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_STORED_FILE_WALLETS: usize = 10_000;
pub const DEFAULT_MAX_RETAINED_RUNS: usize = 20;

// Wallet-list downloads
pub const LARGE_DOWNLOAD_THRESHOLD: usize = 100_000;
pub const DOWNLOAD_CHUNK_SIZE: usize = 50_000;
pub const MAX_COMPARE_FILES: usize = 4;

// Storage keys
pub const KEY_WALLETS: &str = "wallet_generator_wallets";
pub const KEY_RPC_CONFIGS: &str = "wallet_generator_rpc_configs";
pub const KEY_WALLET_FILES: &str = "wallet_files";
pub const KEY_SELECTED_FILE: &str = "selected_file_for_check";

// Mnemonic derivation
pub const ETH_DERIVATION_PATH_PREFIX: &str = "m/44'/60'/0'/0";
pub const MAX_MNEMONIC_ACCOUNTS: u32 = 1000;
