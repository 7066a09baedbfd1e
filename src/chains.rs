use serde::Serialize;

use crate::constants::UNKNOWN_CHAIN_SYMBOL;
use crate::models::RpcConfig;

/// Built-in chain table: id, display name, native symbol, public endpoints.
/// Endpoint order is the fallback order.
const BUILTIN_CHAINS: &[(&str, &str, &str, &[&str])] = &[
    (
        "ETH",
        "Ethereum",
        "ETH",
        &[
            "https://eth.llamarpc.com",
            "https://rpc.ankr.com/eth",
            "https://cloudflare-eth.com",
        ],
    ),
    (
        "BNB",
        "BNB Smart Chain",
        "BNB",
        &[
            "https://bsc-dataseed1.binance.org",
            "https://bsc-dataseed2.binance.org",
            "https://bsc-dataseed3.binance.org",
            "https://rpc.ankr.com/bsc",
        ],
    ),
    (
        "POLYGON",
        "Polygon",
        "MATIC",
        &[
            "https://polygon-rpc.com",
            "https://rpc-mainnet.matic.network",
            "https://rpc-mainnet.maticvigil.com",
            "https://rpc.ankr.com/polygon",
        ],
    ),
    (
        "BASE",
        "Base",
        "ETH",
        &[
            "https://mainnet.base.org",
            "https://base.blockpi.network/v1/rpc/public",
        ],
    ),
    (
        "OP",
        "Optimism",
        "ETH",
        &[
            "https://mainnet.optimism.io",
            "https://optimism.blockpi.network/v1/rpc/public",
        ],
    ),
    (
        "ARB",
        "Arbitrum",
        "ETH",
        &[
            "https://arb1.arbitrum.io/rpc",
            "https://arbitrum.blockpi.network/v1/rpc/public",
            "https://rpc.ankr.com/arbitrum",
            "https://arbitrum.llamarpc.com",
        ],
    ),
    (
        "AVAX",
        "Avalanche",
        "AVAX",
        &[
            "https://api.avax.network/ext/bc/C/rpc",
            "https://rpc.ankr.com/avalanche",
        ],
    ),
    (
        "FTM",
        "Fantom",
        "FTM",
        &[
            "https://rpc.fantom.network",
            "https://rpc.ftm.tools",
            "https://rpcapi.fantom.network",
        ],
    ),
];

/// A chain with its resolved, ordered endpoint list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
    pub id: String,
    pub display_name: String,
    pub symbol: String,
    pub endpoints: Vec<String>,
}

impl ChainConfig {
    pub fn primary_endpoint(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }
}

fn builtin(chain_id: &str) -> Option<&'static (&'static str, &'static str, &'static str, &'static [&'static str])> {
    let wanted = chain_id.trim();
    BUILTIN_CHAINS
        .iter()
        .find(|(id, _, _, _)| id.eq_ignore_ascii_case(wanted))
}

/// Built-in endpoints for a chain, empty for unknown ids.
pub fn builtin_endpoints(chain_id: &str) -> Vec<String> {
    builtin(chain_id)
        .map(|(_, _, _, endpoints)| endpoints.iter().map(|e| e.to_string()).collect())
        .unwrap_or_default()
}

pub fn symbol(chain_id: &str) -> &'static str {
    builtin(chain_id)
        .map(|(_, _, symbol, _)| *symbol)
        .unwrap_or(UNKNOWN_CHAIN_SYMBOL)
}

pub fn display_name(chain_id: &str) -> String {
    builtin(chain_id)
        .map(|(_, name, _, _)| name.to_string())
        .unwrap_or_else(|| chain_id.trim().to_ascii_uppercase())
}

pub fn supported_chains() -> Vec<&'static str> {
    BUILTIN_CHAINS.iter().map(|(id, _, _, _)| *id).collect()
}

/// `[user_primary?, ...builtin_defaults]`, duplicates removed in order.
///
/// The user primary is the first override for the chain whose URL is not a
/// built-in endpoint. Stored defaults (`eth-1`, ...) therefore never shadow
/// a custom endpoint added later. With only built-in URLs registered, the
/// first of them is the primary.
pub fn resolve_endpoints(chain_id: &str, overrides: &[RpcConfig]) -> Vec<String> {
    let wanted = chain_id.trim();
    let builtins = builtin_endpoints(wanted);
    let for_chain: Vec<&RpcConfig> = overrides
        .iter()
        .filter(|config| config.chain.trim().eq_ignore_ascii_case(wanted))
        .collect();
    let user = for_chain
        .iter()
        .find(|config| !builtins.iter().any(|url| url == config.url.trim()))
        .or_else(|| for_chain.first());

    let mut urls = Vec::new();
    if let Some(user) = user {
        urls.push(user.url.trim().to_string());
    }
    urls.extend(builtins);

    let mut deduped: Vec<String> = Vec::with_capacity(urls.len());
    for url in urls {
        if url.is_empty() {
            continue;
        }
        if !deduped.iter().any(|existing| existing == &url) {
            deduped.push(url);
        }
    }
    deduped
}

pub fn chain_config(chain_id: &str, overrides: &[RpcConfig]) -> ChainConfig {
    let id = chain_id.trim().to_ascii_uppercase();
    ChainConfig {
        display_name: display_name(&id),
        symbol: symbol(&id).to_string(),
        endpoints: resolve_endpoints(&id, overrides),
        id,
    }
}

/// Every built-in chain plus any chain that only exists as an override.
pub fn all_chain_configs(overrides: &[RpcConfig]) -> Vec<ChainConfig> {
    let mut ids: Vec<String> = supported_chains().iter().map(|id| id.to_string()).collect();
    for config in overrides {
        let id = config.chain.trim().to_ascii_uppercase();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids.iter().map(|id| chain_config(id, overrides)).collect()
}

/// First built-in endpoint per chain, used when nothing is stored yet.
pub fn default_rpc_configs() -> Vec<RpcConfig> {
    BUILTIN_CHAINS
        .iter()
        .filter_map(|(id, name, _, endpoints)| {
            endpoints.first().map(|url| RpcConfig {
                id: format!("{}-1", id.to_ascii_lowercase()),
                chain: id.to_string(),
                url: url.to_string(),
                name: Some(name.to_string()),
            })
        })
        .collect()
}
