use serde::Serialize;
use std::collections::HashSet;

use crate::constants::{DOWNLOAD_CHUNK_SIZE, LARGE_DOWNLOAD_THRESHOLD, MAX_COMPARE_FILES};
use crate::error::{AppError, Result};
use crate::models::{is_valid_evm_address, Wallet};

const LINE_SEPARATOR: &str = " - ";

/// A named wallet list, as uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWalletList {
    pub name: String,
    pub wallets: Vec<Wallet>,
}

/// Per-file outcome of a multi-file load.
#[derive(Debug, Default)]
pub struct LoadedFiles {
    pub files: Vec<NamedWalletList>,
    pub errors: Vec<AppError>,
}

impl LoadedFiles {
    pub fn total_wallets(&self) -> usize {
        self.files.iter().map(|f| f.wallets.len()).sum()
    }
}

/// One downloadable chunk of a wallet list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadPart {
    pub file_name: String,
    pub content: String,
    pub wallet_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub wallets: Vec<Wallet>,
    pub found_in: Vec<String>,
}

/// Parses `privateKey - address` lines.
///
/// Blank lines and lines that do not split into exactly two parts are skipped.
/// A two-part line with a malformed address fails the whole file.
pub fn parse_wallet_list(name: &str, bytes: &[u8]) -> Result<Vec<Wallet>> {
    let content = std::str::from_utf8(bytes).map_err(|_| AppError::FileParse {
        file: name.to_string(),
        message: "content is not valid UTF-8".to_string(),
    })?;

    let mut wallets = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(LINE_SEPARATOR).collect();
        if parts.len() != 2 {
            continue;
        }

        let private_key = parts[0].trim();
        let address = parts[1].trim();
        if !is_valid_evm_address(address) {
            return Err(AppError::FileParse {
                file: name.to_string(),
                message: format!("line {}: invalid address '{}'", line_no + 1, address),
            });
        }
        wallets.push(Wallet::new(address, private_key));
    }

    Ok(wallets)
}

/// Parses every file; one bad file does not stop the others.
pub fn load_wallet_files<'a, I>(files: I) -> LoadedFiles
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut loaded = LoadedFiles::default();
    for (name, bytes) in files {
        match parse_wallet_list(name, bytes) {
            Ok(wallets) => {
                tracing::info!("Loaded {} wallet(s) from {}", wallets.len(), name);
                loaded.files.push(NamedWalletList {
                    name: name.to_string(),
                    wallets,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping wallet file: {}", e);
                loaded.errors.push(e);
            }
        }
    }
    loaded
}

pub fn render_wallet_list(wallets: &[Wallet]) -> String {
    wallets
        .iter()
        .map(|w| format!("{}{}{}", w.private_key, LINE_SEPARATOR, w.address))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lists above the large-download threshold are cut into fixed-size parts
/// named `{base}_part{i}_of_{n}.txt`.
pub fn split_for_download(wallets: &[Wallet], file_name: &str) -> Vec<DownloadPart> {
    if wallets.len() <= LARGE_DOWNLOAD_THRESHOLD {
        return vec![DownloadPart {
            file_name: file_name.to_string(),
            content: render_wallet_list(wallets),
            wallet_count: wallets.len(),
        }];
    }

    let base = file_name.strip_suffix(".txt").unwrap_or(file_name);
    let chunks: Vec<&[Wallet]> = wallets.chunks(DOWNLOAD_CHUNK_SIZE).collect();
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| DownloadPart {
            file_name: format!("{}_part{}_of_{}.txt", base, i + 1, total),
            content: render_wallet_list(chunk),
            wallet_count: chunk.len(),
        })
        .collect()
}

/// Wallets of the first list whose address (case-insensitive) appears in
/// every list. Empty lists are ignored; at least two non-empty ones are needed.
pub fn compare_wallet_files(files: &[NamedWalletList]) -> Result<CompareResult> {
    let valid: Vec<&NamedWalletList> = files.iter().filter(|f| !f.wallets.is_empty()).collect();
    if valid.len() < 2 {
        return Err(AppError::BadRequest(
            "At least two non-empty files are required to compare".to_string(),
        ));
    }
    if valid.len() > MAX_COMPARE_FILES {
        return Err(AppError::BadRequest(format!(
            "At most {} files can be compared at once",
            MAX_COMPARE_FILES
        )));
    }

    let address_sets: Vec<HashSet<String>> = valid
        .iter()
        .map(|f| f.wallets.iter().map(Wallet::normalized_address).collect())
        .collect();

    let mut seen = HashSet::new();
    let wallets = valid[0]
        .wallets
        .iter()
        .filter(|wallet| {
            let address = wallet.normalized_address();
            address_sets[1..].iter().all(|set| set.contains(&address)) && seen.insert(address)
        })
        .cloned()
        .collect();

    Ok(CompareResult {
        wallets,
        found_in: valid.iter().map(|f| f.name.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(n: usize) -> Wallet {
        Wallet::new(format!("0x{:040x}", n), format!("0x{:064x}", n))
    }

    fn list(name: &str, wallets: Vec<Wallet>) -> NamedWalletList {
        NamedWalletList {
            name: name.to_string(),
            wallets,
        }
    }

    #[test]
    fn parse_skips_blank_and_malformed_lines() {
        let content = format!(
            "{pk} - {addr}\n\n   \nheader line\na - b - c\n{pk} - {addr}\r\n",
            pk = "0x01",
            addr = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
        let wallets = parse_wallet_list("w.txt", content.as_bytes()).expect("parse");
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[0].private_key, "0x01");
        assert_eq!(wallets[1].address, "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    }

    #[test]
    fn parse_rejects_bad_address_and_binary_content() {
        let err = parse_wallet_list("bad.txt", b"0x01 - 0xnothex").expect_err("bad address");
        match err {
            AppError::FileParse { file, message } => {
                assert_eq!(file, "bad.txt");
                assert!(message.contains("line 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            parse_wallet_list("bin.dat", &[0xff, 0xfe, 0x00]),
            Err(AppError::FileParse { .. })
        ));
    }

    #[test]
    fn load_collects_errors_per_file() {
        let good = render_wallet_list(&[wallet(1), wallet(2)]);
        let loaded = load_wallet_files(vec![
            ("good.txt", good.as_bytes()),
            ("bad.txt", &b"0x01 - nope"[..]),
        ]);
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.errors.len(), 1);
        assert_eq!(loaded.total_wallets(), 2);
    }

    #[test]
    fn render_then_parse_keeps_wallets() {
        let wallets = vec![wallet(7), wallet(8)];
        let text = render_wallet_list(&wallets);
        assert_eq!(
            text.lines().next(),
            Some(format!("{} - {}", wallets[0].private_key, wallets[0].address).as_str())
        );
        assert_eq!(parse_wallet_list("x", text.as_bytes()).expect("parse"), wallets);
    }

    #[test]
    fn small_lists_download_as_one_file() {
        let parts = split_for_download(&[wallet(1)], "wallet_2024.txt");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].file_name, "wallet_2024.txt");
    }

    #[test]
    fn large_lists_are_split_into_parts() {
        let wallets: Vec<Wallet> = (0..LARGE_DOWNLOAD_THRESHOLD + 1).map(wallet).collect();
        let parts = split_for_download(&wallets, "wallet_x.txt");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].file_name, "wallet_x_part1_of_3.txt");
        assert_eq!(parts[2].file_name, "wallet_x_part3_of_3.txt");
        assert_eq!(parts[0].wallet_count, DOWNLOAD_CHUNK_SIZE);
        assert_eq!(parts[2].wallet_count, 1);
    }

    #[test]
    fn compare_keeps_wallets_present_everywhere() {
        let mut shouting = wallet(2);
        shouting.address = shouting.address.to_ascii_uppercase().replacen("0X", "0x", 1);

        let result = compare_wallet_files(&[
            list("a.txt", vec![wallet(1), wallet(2), wallet(3)]),
            list("b.txt", vec![shouting, wallet(3)]),
            list("empty.txt", vec![]),
            list("c.txt", vec![wallet(3), wallet(2)]),
        ])
        .expect("compare");

        assert_eq!(result.wallets, vec![wallet(2), wallet(3)]);
        assert_eq!(result.found_in, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn compare_needs_two_non_empty_files() {
        assert!(compare_wallet_files(&[list("a", vec![wallet(1)]), list("b", vec![])]).is_err());
        let five: Vec<NamedWalletList> = (0..5).map(|i| list(&i.to_string(), vec![wallet(1)])).collect();
        assert!(compare_wallet_files(&five).is_err());
    }
}
