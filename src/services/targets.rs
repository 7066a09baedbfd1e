use std::collections::HashSet;

use crate::models::Wallet;

/// Lowercased set of addresses of interest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    addresses: HashSet<String>,
}

impl TargetList {
    /// One address per line; lines not starting with `0x` are ignored.
    pub fn parse(text: &str) -> Self {
        let addresses = text
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("0x"))
            .map(str::to_ascii_lowercase)
            .collect();
        Self { addresses }
    }

    /// Downloads the list. Any failure yields an empty list.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Self {
        match Self::try_fetch(client, url).await {
            Ok(targets) => {
                tracing::info!("Loaded {} target address(es) from {}", targets.len(), url);
                targets
            }
            Err(e) => {
                tracing::error!("Failed to load targets from {}: {}", url, e);
                Self::default()
            }
        }
    }

    async fn try_fetch(client: &reqwest::Client, url: &str) -> reqwest::Result<Self> {
        let text = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn check_wallet_match(&self, wallet: &Wallet) -> bool {
        let matched = self.addresses.contains(&wallet.normalized_address());
        if matched {
            // Address only; private keys stay out of the logs.
            tracing::info!("Target match: {}", wallet.address);
        }
        matched
    }

    /// Matching wallets in input order.
    pub fn matching(&self, wallets: &[Wallet]) -> Vec<Wallet> {
        wallets
            .iter()
            .filter(|wallet| self.check_wallet_match(wallet))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn parse_keeps_prefixed_lines_lowercased() {
        let targets = TargetList::parse(&format!("  {ADDRESS}  \n\n# comment\nabc\n0xDEAD\n"));
        assert_eq!(targets.len(), 2);
        assert!(targets.check_wallet_match(&Wallet::new("0xdead", "k")));
    }

    #[test]
    fn match_is_case_insensitive() {
        let targets = TargetList::parse(&ADDRESS.to_ascii_lowercase());
        assert!(targets.check_wallet_match(&Wallet::new(ADDRESS, "k")));
        assert!(targets.check_wallet_match(&Wallet::new(ADDRESS.to_ascii_uppercase().replacen("0X", "0x", 1), "k")));
        assert!(!targets.check_wallet_match(&Wallet::new("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf", "k")));
    }

    #[test]
    fn matching_preserves_input_order() {
        let targets = TargetList::parse("0xbb\n0xaa");
        let wallets = vec![
            Wallet::new("0xAA", "1"),
            Wallet::new("0xcc", "2"),
            Wallet::new("0xBb", "3"),
        ];
        let matched = targets.matching(&wallets);
        assert_eq!(matched, vec![wallets[0].clone(), wallets[2].clone()]);
    }

    #[tokio::test]
    async fn fetch_parses_remote_list() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/targets.txt")
            .with_status(200)
            .with_body(format!("{ADDRESS}\n0xabc\n"))
            .create_async()
            .await;

        let targets =
            TargetList::fetch(&reqwest::Client::new(), &format!("{}/targets.txt", server.url())).await;
        assert_eq!(targets.len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_list() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/targets.txt")
            .with_status(404)
            .create_async()
            .await;

        let targets =
            TargetList::fetch(&reqwest::Client::new(), &format!("{}/targets.txt", server.url())).await;
        assert!(targets.is_empty());
    }
}
