//! Schema-validated tool adapters.
//!
//! Each tool wraps one capability behind a uniform JSON-in/JSON-out call
//! surface. Inputs deserialize into typed structs that reject unknown fields,
//! so malformed calls fail before any network traffic. The registry turns
//! errors into structured failure objects instead of propagating them, which
//! keeps a sequenced workflow able to decide for itself whether to stop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::blockchain::ChainClient;
use crate::config::Config;
use crate::market::MarketClient;
use crate::news::NewsAggregator;
use crate::risk::RiskEngine;
use crate::{Error, Result};

/// A callable capability with a JSON schema-checked input
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn call(&self, input: Value) -> Result<Value>;
}

/// Structured failure payload returned by `ToolRegistry::invoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: String,
    pub message: String,
}

impl ToolFailure {
    fn from_error(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input)
        .map_err(|e| Error::SchemaError(format!("invalid input for {}: {}", tool, e)))
}

/// Name-keyed tool collection. Iteration order is stable for listing.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the full standard toolset wired to live clients.
    pub fn standard(config: &Config) -> Result<Self> {
        let chain = Arc::new(ChainClient::new(config));
        let market = Arc::new(MarketClient::new(config)?);
        let news = Arc::new(NewsAggregator::new(config)?);

        let mut registry = Self::new();
        registry.register(Arc::new(WalletBalanceTool {
            chain: chain.clone(),
        }));
        registry.register(Arc::new(TokenBalancesTool {
            chain: chain.clone(),
        }));
        registry.register(Arc::new(RecentTransactionsTool {
            chain: chain.clone(),
        }));
        registry.register(Arc::new(TokenPriceTool { market }));
        registry.register(Arc::new(CryptoNewsTool { news }));
        registry.register(Arc::new(TokenRiskTool { chain }));
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// `(name, description)` pairs in name order.
    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Invoke a tool by name. Never returns Err: every failure, including an
    /// unknown tool name, becomes an `{"error": {kind, message}}` object.
    pub async fn invoke(&self, name: &str, input: Value) -> Value {
        let outcome = match self.get(name) {
            Some(tool) => tool.call(input).await,
            None => Err(Error::SchemaError(format!("unknown tool: {}", name))),
        };

        match outcome {
            Ok(value) => {
                metrics::counter!("solsight_tool_invocations_total", 1,
                    "tool" => name.to_string(), "outcome" => "ok");
                value
            }
            Err(err) => {
                metrics::counter!("solsight_tool_invocations_total", 1,
                    "tool" => name.to_string(), "outcome" => "error");
                log::warn!("tool {} failed: {}", name, err);
                json!({ "error": ToolFailure::from_error(&err) })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WalletBalanceInput {
    address: String,
}

/// Native SOL balance of a wallet
pub struct WalletBalanceTool {
    chain: Arc<ChainClient>,
}

#[async_trait]
impl Tool for WalletBalanceTool {
    fn name(&self) -> &'static str {
        "wallet_balance"
    }

    fn description(&self) -> &'static str {
        "Native SOL balance of a wallet address"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: WalletBalanceInput = parse_input(self.name(), input)?;
        let balance = self.chain.get_balance(&input.address).await?;
        Ok(json!({ "address": input.address, "balance_sol": balance }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenBalancesInput {
    owner: String,
    mints: Vec<String>,
}

/// SPL balances for one owner across several mints
pub struct TokenBalancesTool {
    chain: Arc<ChainClient>,
}

#[async_trait]
impl Tool for TokenBalancesTool {
    fn name(&self) -> &'static str {
        "token_balances"
    }

    fn description(&self) -> &'static str {
        "SPL token balances for an owner across a list of mints"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: TokenBalancesInput = parse_input(self.name(), input)?;
        let balances = self
            .chain
            .get_token_balances(&input.owner, &input.mints)
            .await?;
        let entries: Vec<Value> = balances
            .into_iter()
            .map(|(mint, b)| {
                json!({ "mint": mint, "balance": b.balance, "decimals": b.decimals })
            })
            .collect();
        Ok(json!({ "owner": input.owner, "balances": entries }))
    }
}

fn default_tx_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecentTransactionsInput {
    address: String,
    #[serde(default = "default_tx_limit")]
    limit: usize,
}

/// Recent classified transactions for an address
pub struct RecentTransactionsTool {
    chain: Arc<ChainClient>,
}

#[async_trait]
impl Tool for RecentTransactionsTool {
    fn name(&self) -> &'static str {
        "recent_transactions"
    }

    fn description(&self) -> &'static str {
        "Recent transactions for an address, classified by activity type"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: RecentTransactionsInput = parse_input(self.name(), input)?;
        let records = self
            .chain
            .get_recent_transactions(&input.address, input.limit)
            .await?;
        Ok(json!({ "address": input.address, "transactions": records }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenPriceInput {
    token: String,
}

/// Market price snapshot for a token id, symbol or name
pub struct TokenPriceTool {
    market: Arc<MarketClient>,
}

#[async_trait]
impl Tool for TokenPriceTool {
    fn name(&self) -> &'static str {
        "token_price"
    }

    fn description(&self) -> &'static str {
        "Current USD price, change and volume for a token"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: TokenPriceInput = parse_input(self.name(), input)?;
        let snapshot = self.market.get_price_data(&input.token).await?;
        Ok(serde_json::to_value(snapshot)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CryptoNewsInput {
    #[serde(default)]
    limit: Option<usize>,
}

/// Aggregated crypto news with trending topics
pub struct CryptoNewsTool {
    news: Arc<NewsAggregator>,
}

#[async_trait]
impl Tool for CryptoNewsTool {
    fn name(&self) -> &'static str {
        "crypto_news"
    }

    fn description(&self) -> &'static str {
        "Aggregated, deduplicated crypto news with trending topics"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: CryptoNewsInput = parse_input(self.name(), input)?;
        let mut response = self.news.get_all_news().await?;
        if let Some(limit) = input.limit {
            response.articles.truncate(limit);
        }
        Ok(serde_json::to_value(response)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenRiskInput {
    mint: String,
}

/// Composite risk assessment for a token mint
pub struct TokenRiskTool {
    chain: Arc<ChainClient>,
}

#[async_trait]
impl Tool for TokenRiskTool {
    fn name(&self) -> &'static str {
        "token_risk"
    }

    fn description(&self) -> &'static str {
        "Composite risk score and level for a token mint"
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: TokenRiskInput = parse_input(self.name(), input)?;
        let metrics = RiskEngine::new(&self.chain).analyze_token(&input.mint).await?;
        Ok(serde_json::to_value(metrics)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_registry() -> ToolRegistry {
        // Bogus endpoints: any test reaching the network would fail loudly.
        let mut config = Config::default();
        config.chain.rpc_url = "http://127.0.0.1:1".to_string();
        config.market.base_url = "http://127.0.0.1:1".to_string();
        ToolRegistry::standard(&config).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_field_rejected_before_network() {
        let registry = offline_registry();
        let out = registry
            .invoke(
                "wallet_balance",
                json!({ "address": "11111111111111111111111111111111", "extra": true }),
            )
            .await;
        assert_eq!(out["error"]["kind"], "schema");
    }

    #[tokio::test]
    async fn test_missing_field_rejected() {
        let registry = offline_registry();
        let out = registry.invoke("token_balances", json!({ "owner": "x" })).await;
        assert_eq!(out["error"]["kind"], "schema");
    }

    #[tokio::test]
    async fn test_wrong_type_rejected() {
        let registry = offline_registry();
        let out = registry
            .invoke("recent_transactions", json!({ "address": 42 }))
            .await;
        assert_eq!(out["error"]["kind"], "schema");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_structured_failure() {
        let registry = offline_registry();
        let out = registry.invoke("no_such_tool", json!({})).await;
        assert_eq!(out["error"]["kind"], "schema");
        assert!(out["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_invalid_address_surfaces_without_network() {
        let registry = offline_registry();
        let out = registry
            .invoke("wallet_balance", json!({ "address": "not-base58" }))
            .await;
        assert_eq!(out["error"]["kind"], "invalid_address");
    }

    #[test]
    fn test_list_is_sorted_and_complete() {
        let registry = offline_registry();
        let names: Vec<&str> = registry.list().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "crypto_news",
                "recent_transactions",
                "token_balances",
                "token_price",
                "token_risk",
                "wallet_balance",
            ]
        );
    }
}
