//! Chain data client over the Solana JSON-RPC endpoint.
//!
//! Wraps the nonblocking RPC client with address validation, bounded retries
//! and bounded-concurrency fan-out. Single-value lookups (balance, mint data)
//! fail loudly; list-shaped lookups that feed the risk engine degrade to
//! empty results, since "cannot assess" is itself a signal downstream.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction, UiTransactionEncoding,
};
use spl_token::state::Mint;
use std::str::FromStr;
use std::time::Duration;

use super::address::parse_address;
use super::token_utils::TokenUtils;
use crate::config::Config;
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::{Error, Result};

/// Classification of a transaction inferred from its log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    DeFi,
    Nft,
    TokenTransfer,
    Unknown,
}

/// Confirmation outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Success,
    Failed,
}

/// A classified transaction for an address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    /// Block time (unix seconds), when the node reports one
    pub timestamp: Option<i64>,
    pub tx_type: TxType,
    /// Native balance delta of the primary account, in SOL (signed)
    pub amount: f64,
    pub program_ids: Vec<String>,
    pub status: TxStatus,
    /// True when |amount| exceeds the configured whale threshold
    pub whale: bool,
}

/// SPL token balance in UI units
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenBalance {
    pub balance: f64,
    pub decimals: u8,
}

/// Parsed mint account data. Authorities are `None` once permanently revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnChainTokenData {
    pub supply: u64,
    pub decimals: u8,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

/// One of the largest token holders with its share of supply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolder {
    pub address: String,
    /// Balance in UI units
    pub balance: f64,
    /// balance / total UI supply * 100
    pub percentage: f64,
}

/// Client for chain reads used by the tool layer and the risk engine
pub struct ChainClient {
    rpc: RpcClient,
    commitment: CommitmentConfig,
    retry: RetryPolicy,
    fanout_limit: usize,
    whale_threshold_sol: f64,
}

impl ChainClient {
    pub fn new(config: &Config) -> Self {
        let commitment = match config.chain.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        };
        let rpc = RpcClient::new_with_commitment(config.chain.rpc_url.clone(), commitment);
        Self {
            rpc,
            commitment,
            retry: RetryPolicy {
                max_attempts: config.runtime.max_retries,
                base_delay: Duration::from_millis(config.runtime.retry_base_delay_ms),
                attempt_timeout: Duration::from_secs(config.runtime.request_timeout_secs),
            },
            fanout_limit: config.runtime.fanout_limit.max(1),
            whale_threshold_sol: config.runtime.whale_threshold_sol,
        }
    }

    /// Native balance in SOL. Exhausted retries propagate as
    /// `NetworkExhausted`; a zero here always means an actually empty wallet.
    pub async fn get_balance(&self, address: &str) -> Result<f64> {
        let pubkey = parse_address(address)?;
        let lamports = with_retry("get_balance", self.retry, || async {
            Ok(self.rpc.get_balance(&pubkey).await?)
        })
        .await?;
        Ok(TokenUtils::lamports_to_sol(lamports))
    }

    /// SPL token balance for `(owner, mint)`. A wallet with no token account
    /// for the mint genuinely holds zero, so that case is `{0, 0}`, not an
    /// error.
    pub async fn get_token_balance(&self, owner: &str, mint: &str) -> Result<TokenBalance> {
        let owner_key = parse_address(owner)?;
        let mint_key = parse_address(mint)?;

        let accounts = with_retry("get_token_balance", self.retry, || async {
            Ok(self
                .rpc
                .get_token_accounts_by_owner(&owner_key, TokenAccountsFilter::Mint(mint_key))
                .await?)
        })
        .await?;

        let mut total = 0.0;
        let mut decimals = 0u8;
        for keyed in &accounts {
            if let UiAccountData::Json(parsed) = &keyed.account.data {
                let amount = &parsed.parsed["info"]["tokenAmount"];
                if let Some(ui) = amount["uiAmount"].as_f64() {
                    total += ui;
                }
                if let Some(d) = amount["decimals"].as_u64() {
                    decimals = d as u8;
                }
            }
        }

        Ok(TokenBalance {
            balance: total,
            decimals,
        })
    }

    /// Token balances for one owner across several mints, fetched with
    /// bounded concurrency. Results are paired positionally with `mints`.
    pub async fn get_token_balances(
        &self,
        owner: &str,
        mints: &[String],
    ) -> Result<Vec<(String, TokenBalance)>> {
        parse_address(owner)?;
        for mint in mints {
            parse_address(mint)?;
        }

        futures::stream::iter(mints.iter().cloned())
            .map(|mint| async move {
                let balance = self.get_token_balance(owner, &mint).await?;
                Ok((mint, balance))
            })
            .buffered(self.fanout_limit)
            .collect::<Vec<Result<_>>>()
            .await
            .into_iter()
            .collect()
    }

    /// Up to `limit` recent transactions for `address`, classified by log
    /// keywords. Detail fetches fan out with bounded concurrency and the
    /// output is paired positionally with the signature list: a detail fetch
    /// that fails past its retry budget yields a Failed/Unknown placeholder
    /// instead of being dropped.
    pub async fn get_recent_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let pubkey = parse_address(address)?;

        let signatures = with_retry("get_signatures_for_address", self.retry, || async {
            let config = GetConfirmedSignaturesForAddress2Config {
                before: None,
                until: None,
                limit: Some(limit.min(1000)),
                commitment: Some(self.commitment),
            };
            Ok(self
                .rpc
                .get_signatures_for_address_with_config(&pubkey, config)
                .await?)
        })
        .await?;

        let records = futures::stream::iter(signatures)
            .map(|sig_info| async move {
                match self.fetch_transaction_detail(&sig_info.signature).await {
                    Ok(record) => record,
                    Err(e) => {
                        log::warn!(
                            "transaction detail fetch failed for {}: {}",
                            sig_info.signature,
                            e
                        );
                        TransactionRecord {
                            signature: sig_info.signature.clone(),
                            timestamp: sig_info.block_time,
                            tx_type: TxType::Unknown,
                            amount: 0.0,
                            program_ids: vec![],
                            status: TxStatus::Failed,
                            whale: false,
                        }
                    }
                }
            })
            .buffered(self.fanout_limit)
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }

    async fn fetch_transaction_detail(&self, signature: &str) -> Result<TransactionRecord> {
        let sig = Signature::from_str(signature)
            .map_err(|e| Error::DataError(format!("bad signature {}: {}", signature, e)))?;

        let tx = with_retry("get_transaction", self.retry, || async {
            let config = RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::Json),
                commitment: Some(self.commitment),
                max_supported_transaction_version: Some(0),
            };
            Ok(self.rpc.get_transaction_with_config(&sig, config).await?)
        })
        .await?;

        Ok(self.classify_transaction(signature, &tx))
    }

    fn classify_transaction(
        &self,
        signature: &str,
        tx: &EncodedConfirmedTransactionWithStatusMeta,
    ) -> TransactionRecord {
        let meta = tx.transaction.meta.as_ref();

        let status = match meta.map(|m| m.err.is_none()) {
            Some(true) => TxStatus::Success,
            _ => TxStatus::Failed,
        };

        let logs: Vec<String> = match meta.map(|m| &m.log_messages) {
            Some(OptionSerializer::Some(logs)) => logs.clone(),
            _ => vec![],
        };
        let tx_type = classify_logs(&logs);

        // Signed delta of the fee payer's native balance.
        let amount = meta
            .and_then(|m| {
                let pre = *m.pre_balances.first()? as i128;
                let post = *m.post_balances.first()? as i128;
                Some(TokenUtils::lamport_delta_to_sol(post - pre))
            })
            .unwrap_or(0.0);

        let program_ids = extract_program_ids(&tx.transaction.transaction);

        TransactionRecord {
            signature: signature.to_string(),
            timestamp: tx.block_time,
            tx_type,
            amount,
            program_ids,
            status,
            whale: amount.abs() >= self.whale_threshold_sol,
        }
    }

    /// Mint account data: supply, decimals and the two authorities.
    pub async fn get_onchain_token_data(&self, mint: &str) -> Result<OnChainTokenData> {
        let mint_key = parse_address(mint)?;

        let account = with_retry("get_mint_account", self.retry, || async {
            let response = self
                .rpc
                .get_account_with_commitment(&mint_key, self.commitment)
                .await?;
            response
                .value
                .ok_or_else(|| Error::TokenNotFound(mint.to_string()))
        })
        .await?;

        let parsed =
            Mint::unpack(&account.data).map_err(|_| Error::TokenNotFound(mint.to_string()))?;

        let mint_authority: Option<Pubkey> = parsed.mint_authority.into();
        let freeze_authority: Option<Pubkey> = parsed.freeze_authority.into();

        Ok(OnChainTokenData {
            supply: parsed.supply,
            decimals: parsed.decimals,
            mint_authority: mint_authority.map(|k| k.to_string()),
            freeze_authority: freeze_authority.map(|k| k.to_string()),
        })
    }

    /// Largest holders with their share of total supply. Returns an empty
    /// list when supply is zero or the lookup fails; downstream scoring
    /// treats "no data" as a risk factor of its own.
    pub async fn get_token_holders_distribution(&self, mint: &str) -> Result<Vec<TokenHolder>> {
        let mint_key = parse_address(mint)?;

        let token_data = match self.get_onchain_token_data(mint).await {
            Ok(data) => data,
            Err(Error::InvalidAddress(a)) => return Err(Error::InvalidAddress(a)),
            Err(e) => {
                log::warn!("mint data unavailable for holder distribution: {}", e);
                return Ok(vec![]);
            }
        };

        let total_supply = TokenUtils::format_token_amount(token_data.supply, token_data.decimals);
        if total_supply == 0.0 {
            return Ok(vec![]);
        }

        let largest = match with_retry("get_token_largest_accounts", self.retry, || async {
            Ok(self.rpc.get_token_largest_accounts(&mint_key).await?)
        })
        .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                log::warn!("largest accounts lookup failed for {}: {}", mint, e);
                return Ok(vec![]);
            }
        };

        let balances = largest
            .into_iter()
            .map(|holder| (holder.address, holder.amount.ui_amount.unwrap_or(0.0)));
        Ok(holder_shares(balances, total_supply))
    }
}

/// Map holder balances to supply percentages. A non-positive total supply
/// yields an empty list, so no caller ever divides by zero.
pub(crate) fn holder_shares(
    balances: impl IntoIterator<Item = (String, f64)>,
    total_supply: f64,
) -> Vec<TokenHolder> {
    if total_supply <= 0.0 {
        return vec![];
    }
    balances
        .into_iter()
        .map(|(address, balance)| TokenHolder {
            address,
            balance,
            percentage: balance / total_supply * 100.0,
        })
        .collect()
}

/// Keyword classification over lowercased log messages. DeFi keywords win
/// over NFT keywords, which win over plain token transfers.
pub(crate) fn classify_logs(logs: &[String]) -> TxType {
    let joined = logs.join(" ").to_lowercase();
    if joined.contains("swap") || joined.contains("liquidity") {
        TxType::DeFi
    } else if joined.contains("nft") || joined.contains("mint") {
        TxType::Nft
    } else if joined.contains("token") || joined.contains("transfer") {
        TxType::TokenTransfer
    } else {
        TxType::Unknown
    }
}

fn extract_program_ids(tx: &EncodedTransaction) -> Vec<String> {
    match tx {
        EncodedTransaction::Json(ui_tx) => match &ui_tx.message {
            UiMessage::Raw(raw) => raw
                .instructions
                .iter()
                .filter_map(|ix| raw.account_keys.get(ix.program_id_index as usize).cloned())
                .collect(),
            UiMessage::Parsed(parsed) => parsed
                .instructions
                .iter()
                .filter_map(|ix| match ix {
                    UiInstruction::Parsed(UiParsedInstruction::Parsed(p)) => {
                        Some(p.program_id.clone())
                    }
                    UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(p)) => {
                        Some(p.program_id.clone())
                    }
                    UiInstruction::Compiled(c) => parsed
                        .account_keys
                        .get(c.program_id_index as usize)
                        .map(|k| k.pubkey.clone()),
                })
                .collect(),
        },
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logs(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_defi_logs() {
        let t = classify_logs(&logs(&["Program log: Instruction: Swap"]));
        assert_eq!(t, TxType::DeFi);
        let t = classify_logs(&logs(&["Program log: add Liquidity to pool"]));
        assert_eq!(t, TxType::DeFi);
    }

    #[test]
    fn test_classify_nft_logs() {
        let t = classify_logs(&logs(&["Program log: Mint NFT edition"]));
        assert_eq!(t, TxType::Nft);
    }

    #[test]
    fn test_classify_transfer_logs() {
        let t = classify_logs(&logs(&["Program log: Instruction: Transfer"]));
        assert_eq!(t, TxType::TokenTransfer);
    }

    #[test]
    fn test_classify_unknown_logs() {
        assert_eq!(classify_logs(&[]), TxType::Unknown);
        let t = classify_logs(&logs(&["Program log: Instruction: Vote"]));
        assert_eq!(t, TxType::Unknown);
    }

    #[test]
    fn test_defi_wins_over_transfer() {
        // A swap emits transfer logs too; the DeFi keywords take priority.
        let t = classify_logs(&logs(&[
            "Program log: Instruction: Transfer",
            "Program log: Instruction: Swap",
        ]));
        assert_eq!(t, TxType::DeFi);
    }

    #[test]
    fn test_holder_shares_zero_supply_is_empty() {
        let balances = vec![("whale".to_string(), 600.0), ("shrimp".to_string(), 5.0)];
        assert!(holder_shares(balances, 0.0).is_empty());
        assert!(holder_shares(vec![("a".to_string(), 1.0)], -1.0).is_empty());
    }

    #[test]
    fn test_holder_shares_percentages() {
        let balances = vec![("whale".to_string(), 600.0), ("shrimp".to_string(), 50.0)];
        let holders = holder_shares(balances, 1000.0);

        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0].address, "whale");
        assert_eq!(holders[0].percentage, 60.0);
        assert_eq!(holders[1].percentage, 5.0);
    }

    #[tokio::test]
    async fn test_invalid_address_fails_before_network() {
        // Bogus RPC endpoint: a network call would error differently, so an
        // InvalidAddress result proves we never dialed out.
        let mut config = Config::default();
        config.chain.rpc_url = "http://127.0.0.1:1".to_string();
        let client = ChainClient::new(&config);

        assert!(matches!(
            client.get_balance("definitely-not-base58").await,
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            client.get_recent_transactions("bogus", 10).await,
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            client
                .get_token_balance("bogus", "11111111111111111111111111111111")
                .await,
            Err(Error::InvalidAddress(_))
        ));
    }
}
