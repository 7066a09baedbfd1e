use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ==================== WEI ====================
/// Native-asset amount in the smallest unit. Serialized as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(pub U256);

impl Wei {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Parses `0x`-prefixed hex (as returned by nodes) or a decimal string.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Some(hex_body) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex_body.is_empty() || hex_body.len() > 64 {
                return None;
            }
            return U256::from_str_radix(hex_body, 16).ok().map(Self);
        }
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        U256::from_dec_str(trimmed).ok().map(Self)
    }
}

impl From<U256> for Wei {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for Wei {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Wei::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid wei amount: {raw}")))
    }
}

// ==================== LOOKUP ====================
/// Outcome of a retried query: a value, or nothing after every endpoint failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Indeterminate,
}

impl<T: Default> Lookup<T> {
    /// The zero sentinel stands in for an indeterminate lookup.
    pub fn value_or_default(self) -> T {
        match self {
            Lookup::Found(value) => value,
            Lookup::Indeterminate => T::default(),
        }
    }
}

impl<T> Lookup<T> {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Lookup::Indeterminate)
    }
}

// ==================== RESULTS ====================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    pub wallet_address: String,
    pub chain_id: String,
    pub balance_wei: Wei,
    pub symbol: String,
    pub has_balance: bool,
    /// Every endpoint failed; `balance_wei` is the zero sentinel.
    pub indeterminate: bool,
}

impl BalanceResult {
    pub fn new(wallet_address: &str, chain_id: &str, symbol: &str, balance: Lookup<U256>) -> Self {
        let indeterminate = balance.is_indeterminate();
        let balance_wei = Wei(balance.value_or_default());
        Self {
            wallet_address: wallet_address.to_string(),
            chain_id: chain_id.to_string(),
            has_balance: !balance_wei.is_zero(),
            balance_wei,
            symbol: symbol.to_string(),
            indeterminate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub wallet_address: String,
    pub chain_id: String,
    pub nonce: u64,
    pub balance_wei: Wei,
    pub symbol: String,
    pub has_balance: bool,
    pub has_transactions: bool,
    pub is_used: bool,
    pub indeterminate: bool,
}

impl UsageStatus {
    pub fn new(
        wallet_address: &str,
        chain_id: &str,
        symbol: &str,
        balance: Lookup<U256>,
        nonce: Lookup<u64>,
    ) -> Self {
        let indeterminate = balance.is_indeterminate() || nonce.is_indeterminate();
        let balance_wei = Wei(balance.value_or_default());
        let nonce = nonce.value_or_default();
        let has_balance = !balance_wei.is_zero();
        let has_transactions = nonce > 0;
        Self {
            wallet_address: wallet_address.to_string(),
            chain_id: chain_id.to_string(),
            nonce,
            balance_wei,
            symbol: symbol.to_string(),
            has_balance,
            has_transactions,
            is_used: has_balance || has_transactions,
            indeterminate,
        }
    }
}

/// Result of one (wallet, chain) query; the variant follows the run's mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainCheck {
    Balance(BalanceResult),
    Usage(UsageStatus),
}

impl ChainCheck {
    pub fn chain_id(&self) -> &str {
        match self {
            ChainCheck::Balance(result) => &result.chain_id,
            ChainCheck::Usage(status) => &status.chain_id,
        }
    }

    pub fn wallet_address(&self) -> &str {
        match self {
            ChainCheck::Balance(result) => &result.wallet_address,
            ChainCheck::Usage(status) => &status.wallet_address,
        }
    }

    pub fn balance_wei(&self) -> Wei {
        match self {
            ChainCheck::Balance(result) => result.balance_wei,
            ChainCheck::Usage(status) => status.balance_wei,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            ChainCheck::Balance(result) => &result.symbol,
            ChainCheck::Usage(status) => &status.symbol,
        }
    }

    pub fn has_balance(&self) -> bool {
        !self.balance_wei().is_zero()
    }

    pub fn is_used(&self) -> bool {
        match self {
            ChainCheck::Balance(result) => result.has_balance,
            ChainCheck::Usage(status) => status.is_used,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        match self {
            ChainCheck::Balance(result) => result.indeterminate,
            ChainCheck::Usage(status) => status.indeterminate,
        }
    }

    pub fn as_usage(&self) -> Option<&UsageStatus> {
        match self {
            ChainCheck::Usage(status) => Some(status),
            ChainCheck::Balance(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub wallet_index: usize,
    pub chain_index: usize,
    pub check: ChainCheck,
    pub checked_at: DateTime<Utc>,
}

// ==================== RUNS ====================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub current: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64) * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// `eth_getBalance` only.
    #[default]
    Balance,
    /// `eth_getBalance` then `eth_getTransactionCount`.
    Usage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
    WorkerPool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed(String),
}
