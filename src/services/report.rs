use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::constants::DISPLAY_FRACTION_DIGITS;
use crate::models::{BalanceResult, ChainCheck, CheckRecord, PaginatedResponse, Wallet, Wei};

/// Aggregated outcome of every chain checked for one wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletReport {
    pub wallet_index: usize,
    pub wallet: Wallet,
    pub checks: Vec<ChainCheck>,
    pub has_balance: bool,
    pub has_transactions: bool,
    pub is_used: bool,
    /// Chains whose lookup exhausted every endpoint.
    pub indeterminate_chains: usize,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageFilter {
    Used,
    Unused,
    WithBalance,
    WithTransactions,
}

impl UsageFilter {
    pub fn matches(&self, report: &WalletReport) -> bool {
        match self {
            UsageFilter::Used => report.is_used,
            UsageFilter::Unused => !report.is_used,
            UsageFilter::WithBalance => report.has_balance,
            UsageFilter::WithTransactions => report.has_transactions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStatistics {
    pub total: usize,
    pub used: usize,
    pub unused: usize,
    pub with_balance: usize,
    pub with_transactions: usize,
    pub indeterminate: usize,
    pub used_percentage: f64,
    pub with_balance_percentage: f64,
    pub with_transactions_percentage: f64,
}

pub fn has_balance(result: &BalanceResult) -> bool {
    !result.balance_wei.is_zero()
}

/// Renders `wei` (decimal or `0x` hex) as `whole.ffffff`.
///
/// The fraction is left-padded to `decimals` digits and then cut to its first
/// six characters, so amounts are truncated rather than rounded.
pub fn format_balance(wei: &str, decimals: u32) -> String {
    const FALLBACK: &str = "0.000000";

    let Some(amount) = Wei::parse(wei) else {
        return FALLBACK.to_string();
    };
    let Some(divisor) = U256::from(10u64).checked_pow(U256::from(decimals)) else {
        return FALLBACK.to_string();
    };

    let value = amount.as_u256();
    let whole = value / divisor;
    let fraction = value % divisor;
    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let shown: String = padded.chars().take(DISPLAY_FRACTION_DIGITS).collect();
    format!("{}.{}", whole, shown)
}

/// Groups records by wallet, in wallet input order. Wallets without any
/// record (e.g. after a cancel) are left out.
pub fn build_reports(wallets: &[Wallet], records: &[CheckRecord]) -> Vec<WalletReport> {
    let mut grouped: Vec<Vec<&CheckRecord>> = vec![Vec::new(); wallets.len()];
    for record in records {
        if let Some(bucket) = grouped.get_mut(record.wallet_index) {
            bucket.push(record);
        }
    }

    grouped
        .into_iter()
        .enumerate()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(index, mut bucket)| {
            bucket.sort_by_key(|r| r.chain_index);
            let checks: Vec<ChainCheck> = bucket.iter().map(|r| r.check.clone()).collect();
            let has_balance = checks.iter().any(ChainCheck::has_balance);
            let has_transactions = checks
                .iter()
                .filter_map(ChainCheck::as_usage)
                .any(|status| status.has_transactions);
            let checked_at = bucket
                .iter()
                .map(|r| r.checked_at)
                .max()
                .unwrap_or_else(Utc::now);

            WalletReport {
                wallet_index: index,
                wallet: wallets[index].clone(),
                is_used: checks.iter().any(ChainCheck::is_used),
                indeterminate_chains: checks.iter().filter(|c| c.is_indeterminate()).count(),
                checks,
                has_balance,
                has_transactions,
                checked_at,
            }
        })
        .collect()
}

/// `privateKey - address - CHAIN: amount SYMBOL, ...` for every funded wallet.
/// Only chains with a nonzero balance are listed.
pub fn export_balances(reports: &[WalletReport]) -> String {
    reports
        .iter()
        .filter(|report| report.has_balance)
        .map(|report| {
            let balances: Vec<String> = report
                .checks
                .iter()
                .filter(|check| check.has_balance())
                .map(|check| {
                    format!(
                        "{}: {} {}",
                        check.chain_id(),
                        format_balance(&check.balance_wei().to_string(), crate::constants::NATIVE_DECIMALS),
                        check.symbol()
                    )
                })
                .collect();
            format!(
                "{} - {} - {}",
                report.wallet.private_key,
                report.wallet.address,
                balances.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `privateKey,address,nonce[,source]` for every used wallet, with the
/// highest nonce seen across chains.
pub fn export_used_wallets(reports: &[WalletReport], source: Option<&str>) -> String {
    reports
        .iter()
        .filter(|report| report.is_used)
        .map(|report| {
            let nonce = report
                .checks
                .iter()
                .filter_map(ChainCheck::as_usage)
                .map(|status| status.nonce)
                .max()
                .unwrap_or(0);
            let mut line = format!(
                "{},{},{}",
                report.wallet.private_key, report.wallet.address, nonce
            );
            if let Some(source) = source {
                line.push(',');
                line.push_str(source);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn usage_statistics(reports: &[WalletReport]) -> UsageStatistics {
    let total = reports.len();
    let used = reports.iter().filter(|r| r.is_used).count();
    let with_balance = reports.iter().filter(|r| r.has_balance).count();
    let with_transactions = reports.iter().filter(|r| r.has_transactions).count();
    let percentage = |count: usize| {
        if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    };

    UsageStatistics {
        total,
        used,
        unused: total - used,
        with_balance,
        with_transactions,
        indeterminate: reports.iter().filter(|r| r.indeterminate_chains > 0).count(),
        used_percentage: percentage(used),
        with_balance_percentage: percentage(with_balance),
        with_transactions_percentage: percentage(with_transactions),
    }
}

pub fn filter_by_usage(reports: &[WalletReport], filter: UsageFilter) -> Vec<Wallet> {
    reports
        .iter()
        .filter(|report| filter.matches(report))
        .map(|report| report.wallet.clone())
        .collect()
}

/// Sorts newest first by check time. Ties keep wallet order.
pub fn newest_first(mut reports: Vec<WalletReport>) -> Vec<WalletReport> {
    reports.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
    reports
}

/// 1-based page of `items`. Pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> PaginatedResponse<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(per_page);

    PaginatedResponse {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        page,
        limit: per_page,
        total,
        total_pages: total.div_ceil(per_page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lookup, UsageStatus};
    use chrono::Duration;

    fn wallet(n: u64) -> Wallet {
        Wallet::new(format!("0x{:040x}", n), format!("0x{:064x}", n))
    }

    fn balance_record(wallet_index: usize, chain_index: usize, chain: &str, wei: u64) -> CheckRecord {
        CheckRecord {
            wallet_index,
            chain_index,
            check: ChainCheck::Balance(BalanceResult::new(
                &format!("0x{:040x}", wallet_index + 1),
                chain,
                crate::chains::symbol(chain),
                Lookup::Found(U256::from(wei)),
            )),
            checked_at: Utc::now(),
        }
    }

    fn usage_record(wallet_index: usize, wei: u64, nonce: u64) -> CheckRecord {
        CheckRecord {
            wallet_index,
            chain_index: 0,
            check: ChainCheck::Usage(UsageStatus::new(
                "0xabc",
                "ETH",
                "ETH",
                Lookup::Found(U256::from(wei)),
                Lookup::Found(nonce),
            )),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn format_balance_truncates_to_six_digits() {
        assert_eq!(format_balance("1500000000000000000", 18), "1.500000");
        assert_eq!(format_balance("1000", 18), "0.000000");
        assert_eq!(format_balance("0x3e8", 18), "0.000000");
        assert_eq!(format_balance("123456789999999999999", 18), "123.456789");
        assert_eq!(format_balance("1234567", 6), "1.234567");
        assert_eq!(format_balance("0", 18), "0.000000");
    }

    #[test]
    fn format_balance_falls_back_on_bad_input() {
        assert_eq!(format_balance("not a number", 18), "0.000000");
        assert_eq!(format_balance("", 18), "0.000000");
        assert_eq!(format_balance("1", 200), "0.000000");
    }

    #[test]
    fn format_balance_whole_part_is_integer_division() {
        let wei = "98765000000000000000000";
        let formatted = format_balance(wei, 18);
        assert!(formatted.starts_with("98765."));
    }

    #[test]
    fn has_balance_boundary() {
        let zero = BalanceResult::new("0xabc", "ETH", "ETH", Lookup::Found(U256::zero()));
        let one = BalanceResult::new("0xabc", "ETH", "ETH", Lookup::Found(U256::one()));
        assert!(!has_balance(&zero));
        assert!(has_balance(&one));
    }

    #[test]
    fn export_lists_only_funded_wallets_and_chains() {
        let wallets = vec![wallet(1), wallet(2)];
        let records = vec![
            balance_record(0, 0, "ETH", 0),
            balance_record(0, 1, "POLYGON", 2_000_000_000_000_000_000),
            balance_record(1, 0, "ETH", 0),
            balance_record(1, 1, "POLYGON", 0),
        ];
        let reports = build_reports(&wallets, &records);
        let export = export_balances(&reports);
        assert_eq!(
            export,
            format!(
                "{} - {} - POLYGON: 2.000000 MATIC",
                wallets[0].private_key, wallets[0].address
            )
        );
    }

    #[test]
    fn export_joins_multiple_chains() {
        let wallets = vec![wallet(1)];
        let records = vec![
            balance_record(0, 1, "BNB", 1_000_000_000_000_000_000),
            balance_record(0, 0, "ETH", 500_000_000_000_000_000),
        ];
        let export = export_balances(&build_reports(&wallets, &records));
        assert!(export.ends_with("ETH: 0.500000 ETH, BNB: 1.000000 BNB"));
    }

    #[test]
    fn reports_skip_wallets_without_records() {
        let wallets = vec![wallet(1), wallet(2), wallet(3)];
        let records = vec![balance_record(0, 0, "ETH", 0), balance_record(2, 0, "ETH", 1)];
        let reports = build_reports(&wallets, &records);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].wallet_index, 0);
        assert_eq!(reports[1].wallet_index, 2);
        assert!(reports[1].has_balance);
    }

    #[test]
    fn usage_statistics_and_filters() {
        let wallets = vec![wallet(1), wallet(2), wallet(3), wallet(4)];
        let records = vec![
            usage_record(0, 0, 5),
            usage_record(1, 10, 0),
            usage_record(2, 0, 0),
            usage_record(3, 7, 1),
        ];
        let reports = build_reports(&wallets, &records);
        let stats = usage_statistics(&reports);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.used, 3);
        assert_eq!(stats.unused, 1);
        assert_eq!(stats.with_balance, 2);
        assert_eq!(stats.with_transactions, 2);
        assert!((stats.used_percentage - 75.0).abs() < f64::EPSILON);

        assert_eq!(filter_by_usage(&reports, UsageFilter::Unused), vec![wallets[2].clone()]);
        assert_eq!(
            filter_by_usage(&reports, UsageFilter::WithTransactions),
            vec![wallets[0].clone(), wallets[3].clone()]
        );

        let export = export_used_wallets(&reports, Some("batch.txt"));
        let first = export.lines().next().expect("one line");
        assert_eq!(
            first,
            format!("{},{},5,batch.txt", wallets[0].private_key, wallets[0].address)
        );
        assert_eq!(export.lines().count(), 3);
    }

    #[test]
    fn empty_statistics_have_zero_percentages() {
        let stats = usage_statistics(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.used_percentage, 0.0);
    }

    #[test]
    fn newest_first_then_paginate() {
        let wallets: Vec<Wallet> = (1..=45).map(wallet).collect();
        let records: Vec<CheckRecord> = (0..45)
            .map(|i| {
                let mut record = balance_record(i, 0, "ETH", 0);
                record.checked_at = Utc::now() + Duration::seconds(i as i64);
                record
            })
            .collect();
        let reports = newest_first(build_reports(&wallets, &records));
        assert_eq!(reports[0].wallet_index, 44);

        let page = paginate(&reports, 3, 20);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].wallet_index, 4);

        let beyond = paginate(&reports, 9, 20);
        assert!(beyond.items.is_empty());
        assert_eq!(paginate(&reports, 0, 20).page, 1);
    }
}
