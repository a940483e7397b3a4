//! Composite token risk scoring.
//!
//! Four independent analyses each start at 100 and subtract flat penalties
//! per detected condition (floored at 0): holder concentration, transaction
//! patterns, liquidity, and contract authorities. The overall score is the
//! equal-weight mean of the four sub-scores. The engine's contract is
//! best-effort: a sub-analysis whose lookups fail degrades to a zero score
//! with an explanatory factor instead of aborting the composite. Only a
//! malformed address fails fast, before any network call.

use serde::{Deserialize, Serialize};

use crate::blockchain::{
    is_valid_address, ChainClient, OnChainTokenData, TokenHolder, TransactionRecord, TxStatus,
    TxType,
};
use crate::{Error, Result};

/// Recent transactions examined per token
pub const TX_SAMPLE_SIZE: usize = 100;

// Holder concentration thresholds and penalties
const TOP_HOLDER_HIGH_PCT: f64 = 50.0;
const TOP_HOLDER_HIGH_PENALTY: f64 = 40.0;
const TOP_HOLDER_MED_PCT: f64 = 30.0;
const TOP_HOLDER_MED_PENALTY: f64 = 20.0;
const TOP10_HIGH_PCT: f64 = 90.0;
const TOP10_HIGH_PENALTY: f64 = 30.0;
const TOP10_MED_PCT: f64 = 70.0;
const TOP10_MED_PENALTY: f64 = 15.0;

// Transaction pattern thresholds and penalties
const MIN_TX_COUNT: usize = 10;
const LOW_TX_COUNT_PENALTY: f64 = 30.0;
const FAILED_RATIO_THRESHOLD: f64 = 0.2;
const FAILED_RATIO_PENALTY: f64 = 25.0;
const TRANSFER_DOMINANCE_THRESHOLD: f64 = 0.8;
const TRANSFER_DOMINANCE_PENALTY: f64 = 20.0;
// More than one transaction per 10 seconds sustained across the sample
const HIGH_FREQUENCY_TX_PER_SEC: f64 = 0.1;
const HIGH_FREQUENCY_PENALTY: f64 = 25.0;

// Liquidity thresholds and penalties
const LOW_AVG_VALUE_SOL: f64 = 0.1;
const LOW_AVG_VALUE_PENALTY: f64 = 20.0;
const TX_PER_DAY_LOW: f64 = 1.0;
const TX_PER_DAY_LOW_PENALTY: f64 = 30.0;
const TX_PER_DAY_MED: f64 = 10.0;
const TX_PER_DAY_MED_PENALTY: f64 = 15.0;

// Contract authority penalties. The strongest signals in the composite.
const MINT_AUTHORITY_PENALTY: f64 = 50.0;
const FREEZE_AUTHORITY_PENALTY: f64 = 30.0;

/// Risk level buckets applied to the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    ExtremelyHigh,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 40.0 {
            RiskLevel::ExtremelyHigh
        } else if score < 60.0 {
            RiskLevel::High
        } else if score < 80.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::ExtremelyHigh => "EXTREMELY HIGH",
        }
    }
}

/// One sub-analysis outcome: a 0-100 score plus the conditions that cut it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubScore {
    pub score: f64,
    pub factors: Vec<String>,
}

impl SubScore {
    fn clean() -> Self {
        Self {
            score: 100.0,
            factors: vec![],
        }
    }

    fn no_data(factor: &str) -> Self {
        Self {
            score: 0.0,
            factors: vec![factor.to_string()],
        }
    }

    fn failed(analysis: &str, err: &Error) -> Self {
        Self {
            score: 0.0,
            factors: vec![format!("error analyzing {}: {}", analysis, err)],
        }
    }

    fn penalize(&mut self, penalty: f64, factor: impl Into<String>) {
        self.score = (self.score - penalty).max(0.0);
        self.factors.push(factor.into());
    }
}

/// Composite risk assessment for a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub liquidity_score: f64,
    pub holder_concentration_score: f64,
    pub transaction_pattern_score: f64,
    pub contract_risk_score: f64,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

/// Largest-holder share of supply and the top-10 combined share.
fn score_holder_concentration(holders: &[TokenHolder]) -> SubScore {
    if holders.is_empty() {
        return SubScore::no_data("no holder distribution data available");
    }

    let mut result = SubScore::clean();
    let top = holders
        .iter()
        .map(|h| h.percentage)
        .fold(0.0f64, f64::max);
    let top10: f64 = holders.iter().take(10).map(|h| h.percentage).sum();

    if top > TOP_HOLDER_HIGH_PCT {
        result.penalize(
            TOP_HOLDER_HIGH_PENALTY,
            format!("extreme concentration: largest holder owns {:.1}% of supply", top),
        );
    } else if top > TOP_HOLDER_MED_PCT {
        result.penalize(
            TOP_HOLDER_MED_PENALTY,
            format!("high concentration: largest holder owns {:.1}% of supply", top),
        );
    }

    if top10 > TOP10_HIGH_PCT {
        result.penalize(
            TOP10_HIGH_PENALTY,
            format!("top 10 holders own {:.1}% of supply", top10),
        );
    } else if top10 > TOP10_MED_PCT {
        result.penalize(
            TOP10_MED_PENALTY,
            format!("top 10 holders own a high {:.1}% of supply", top10),
        );
    }

    result
}

/// Failure ratio, transfer dominance and sustained burst frequency over the
/// recent transaction sample.
fn score_transaction_patterns(txs: &[TransactionRecord]) -> SubScore {
    let mut result = SubScore::clean();

    if txs.len() < MIN_TX_COUNT {
        result.penalize(
            LOW_TX_COUNT_PENALTY,
            format!("very low transaction count ({} recent)", txs.len()),
        );
        return result;
    }

    let failed = txs.iter().filter(|t| t.status == TxStatus::Failed).count();
    let failed_ratio = failed as f64 / txs.len() as f64;
    if failed_ratio > FAILED_RATIO_THRESHOLD {
        result.penalize(
            FAILED_RATIO_PENALTY,
            format!("high failure rate: {:.0}% of recent transactions failed", failed_ratio * 100.0),
        );
    }

    let transfers = txs
        .iter()
        .filter(|t| t.tx_type == TxType::TokenTransfer)
        .count();
    if transfers as f64 / txs.len() as f64 > TRANSFER_DOMINANCE_THRESHOLD {
        result.penalize(
            TRANSFER_DOMINANCE_PENALTY,
            "activity dominated by simple transfers",
        );
    }

    if let Some(span) = observed_timespan_secs(txs) {
        if span > 0.0 {
            let rate = (txs.len() as f64 - 1.0) / span;
            if rate > HIGH_FREQUENCY_TX_PER_SEC {
                result.penalize(
                    HIGH_FREQUENCY_PENALTY,
                    format!("unusually high transaction frequency ({:.2} tx/s)", rate),
                );
            }
        }
    }

    result
}

/// Average transaction value and daily throughput as liquidity proxies.
fn score_liquidity(txs: &[TransactionRecord]) -> SubScore {
    if txs.is_empty() {
        return SubScore::no_data("no transaction activity to assess liquidity");
    }

    let mut result = SubScore::clean();

    let avg_value = txs.iter().map(|t| t.amount.abs()).sum::<f64>() / txs.len() as f64;
    if avg_value < LOW_AVG_VALUE_SOL {
        result.penalize(
            LOW_AVG_VALUE_PENALTY,
            format!("low average transaction value ({:.4} SOL)", avg_value),
        );
    }

    if let Some(span) = observed_timespan_secs(txs) {
        if span > 0.0 {
            let per_day = txs.len() as f64 / (span / 86_400.0);
            if per_day < TX_PER_DAY_LOW {
                result.penalize(
                    TX_PER_DAY_LOW_PENALTY,
                    format!("very low activity ({:.1} tx/day)", per_day),
                );
            } else if per_day < TX_PER_DAY_MED {
                result.penalize(
                    TX_PER_DAY_MED_PENALTY,
                    format!("low activity ({:.1} tx/day)", per_day),
                );
            }
        }
    }

    result
}

/// Active mint or freeze authority. Either one dominates the composite.
fn score_contract(data: &OnChainTokenData) -> SubScore {
    let mut result = SubScore::clean();

    if data.mint_authority.is_some() {
        result.penalize(
            MINT_AUTHORITY_PENALTY,
            "mint authority is active: supply can be inflated at will",
        );
    }
    if data.freeze_authority.is_some() {
        result.penalize(
            FREEZE_AUTHORITY_PENALTY,
            "freeze authority is active: holder accounts can be frozen",
        );
    }

    result
}

fn observed_timespan_secs(txs: &[TransactionRecord]) -> Option<f64> {
    let timestamps: Vec<i64> = txs.iter().filter_map(|t| t.timestamp).collect();
    if timestamps.len() < 2 {
        return None;
    }
    let min = timestamps.iter().min()?;
    let max = timestamps.iter().max()?;
    Some((max - min) as f64)
}

/// Combine the four sub-analyses into the composite metrics.
fn compose(
    holder: SubScore,
    pattern: SubScore,
    liquidity: SubScore,
    contract: SubScore,
) -> RiskMetrics {
    // Equal-weight mean across all four sub-scores.
    let overall = (holder.score + pattern.score + liquidity.score + contract.score) / 4.0;

    let mut risk_factors = holder.factors;
    risk_factors.extend(pattern.factors);
    risk_factors.extend(liquidity.factors);
    risk_factors.extend(contract.factors);

    RiskMetrics {
        liquidity_score: liquidity.score,
        holder_concentration_score: holder.score,
        transaction_pattern_score: pattern.score,
        contract_risk_score: contract.score,
        overall_risk_score: overall,
        risk_level: RiskLevel::from_score(overall),
        risk_factors,
    }
}

/// Orchestrates the chain lookups behind the four sub-analyses.
pub struct RiskEngine<'a> {
    chain: &'a ChainClient,
}

impl<'a> RiskEngine<'a> {
    pub fn new(chain: &'a ChainClient) -> Self {
        Self { chain }
    }

    /// Best-effort composite risk score for `mint`. Always returns metrics
    /// once the address parses; individual lookup failures become zero-score
    /// sub-analyses with explanatory factors.
    pub async fn analyze_token(&self, mint: &str) -> Result<RiskMetrics> {
        if !is_valid_address(mint) {
            return Err(Error::InvalidAddress(mint.to_string()));
        }

        let (holders, transactions, token_data) = tokio::join!(
            self.chain.get_token_holders_distribution(mint),
            self.chain.get_recent_transactions(mint, TX_SAMPLE_SIZE),
            self.chain.get_onchain_token_data(mint),
        );

        let holder_score = match &holders {
            Ok(holders) => score_holder_concentration(holders),
            Err(e) => SubScore::failed("holder concentration", e),
        };

        let (pattern_score, liquidity_score) = match &transactions {
            Ok(txs) => (score_transaction_patterns(txs), score_liquidity(txs)),
            Err(e) => (
                SubScore::failed("transaction patterns", e),
                SubScore::failed("liquidity", e),
            ),
        };

        let contract_score = match &token_data {
            Ok(data) => score_contract(data),
            Err(e) => SubScore::failed("contract authorities", e),
        };

        let metrics = compose(holder_score, pattern_score, liquidity_score, contract_score);
        log::info!(
            "risk assessment for {}: overall {:.1} ({})",
            mint,
            metrics.overall_risk_score,
            metrics.risk_level.as_str()
        );
        Ok(metrics)
    }
}
