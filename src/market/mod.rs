//! Market data client for the CoinGecko REST API.
//!
//! The full identifier catalog (`/coins/list`) is heavy, so it is cached for
//! an hour and identity resolution runs against the cached list. Price
//! snapshots are fetched per request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::utils::cache::{Clock, TtlCache};
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::{Error, Result};

/// Canonical token identity from the provider's catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenIdentity {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// Point-in-time price data for a resolved token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub identity: TokenIdentity,
    pub price_usd: f64,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub volume_24h: Option<f64>,
}

pub struct MarketClient {
    http: reqwest::Client,
    base_url: String,
    catalog: TtlCache<Arc<Vec<TokenIdentity>>>,
    retry: RetryPolicy,
}

impl MarketClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(crate::utils::cache::SystemClock))
    }

    /// Constructor with an injected clock, used by TTL tests.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.runtime.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.market.base_url.trim_end_matches('/').to_string(),
            catalog: TtlCache::with_clock(
                Duration::from_secs(config.market.catalog_ttl_secs),
                clock,
            ),
            retry: RetryPolicy {
                max_attempts: config.runtime.max_retries,
                base_delay: Duration::from_millis(config.runtime.retry_base_delay_ms),
                attempt_timeout: Duration::from_secs(config.runtime.request_timeout_secs),
            },
        })
    }

    async fn catalog(&self) -> Result<Arc<Vec<TokenIdentity>>> {
        self.catalog
            .get_or_refresh(|| async {
                let url = format!("{}/coins/list", self.base_url);
                let list = with_retry("coins_list", self.retry, || async {
                    let response = self
                        .http
                        .get(&url)
                        .header("Accept", "application/json")
                        .send()
                        .await?;
                    if !response.status().is_success() {
                        return Err(Error::DataError(format!(
                            "catalog request failed with status {}",
                            response.status()
                        )));
                    }
                    Ok(response.json::<Vec<TokenIdentity>>().await?)
                })
                .await?;
                log::debug!("refreshed token catalog ({} entries)", list.len());
                Ok(Arc::new(list))
            })
            .await
    }

    /// Resolve a human identifier (id, symbol or name) against the cached
    /// catalog. Case-insensitive exact match; id beats symbol beats name.
    pub async fn resolve_token_identity(&self, term: &str) -> Result<Option<TokenIdentity>> {
        let catalog = self.catalog().await?;
        Ok(resolve_in_catalog(&catalog, term))
    }

    /// Current price, 24h/7d change and 24h volume for a resolved token.
    pub async fn get_price_data(&self, term: &str) -> Result<PriceSnapshot> {
        let identity = self
            .resolve_token_identity(term)
            .await?
            .ok_or_else(|| Error::TokenNotFound(term.to_string()))?;

        let url = format!("{}/simple/price", self.base_url);
        let body = with_retry("simple_price", self.retry, || async {
            let response = self
                .http
                .get(&url)
                .query(&[
                    ("ids", identity.id.as_str()),
                    ("vs_currencies", "usd"),
                    ("include_24hr_vol", "true"),
                    ("include_24hr_change", "true"),
                    ("include_7d_change", "true"),
                ])
                .header("Accept", "application/json")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Error::DataError(format!(
                    "price request failed with status {}",
                    response.status()
                )));
            }
            Ok(response.json::<Value>().await?)
        })
        .await?;

        let entry = body
            .get(&identity.id)
            .ok_or_else(|| Error::PriceDataMissing(identity.id.clone()))?;
        let price_usd = entry
            .get("usd")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::PriceDataMissing(identity.id.clone()))?;

        Ok(PriceSnapshot {
            price_usd,
            change_24h: entry.get("usd_24h_change").and_then(Value::as_f64),
            change_7d: entry.get("usd_7d_change").and_then(Value::as_f64),
            volume_24h: entry.get("usd_24h_vol").and_then(Value::as_f64),
            identity,
        })
    }
}

/// Pure catalog lookup: case-insensitive exact match on id, then symbol,
/// then name; first match in catalog order wins within each tier.
pub(crate) fn resolve_in_catalog(
    catalog: &[TokenIdentity],
    term: &str,
) -> Option<TokenIdentity> {
    let needle = term.to_lowercase();
    catalog
        .iter()
        .find(|t| t.id.to_lowercase() == needle)
        .or_else(|| catalog.iter().find(|t| t.symbol.to_lowercase() == needle))
        .or_else(|| catalog.iter().find(|t| t.name.to_lowercase() == needle))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<TokenIdentity> {
        vec![
            TokenIdentity {
                id: "bitcoin".to_string(),
                symbol: "btc".to_string(),
                name: "Bitcoin".to_string(),
            },
            TokenIdentity {
                id: "solana".to_string(),
                symbol: "sol".to_string(),
                name: "Solana".to_string(),
            },
            TokenIdentity {
                id: "btc-lightning".to_string(),
                symbol: "lnbtc".to_string(),
                name: "BTC Lightning".to_string(),
            },
        ]
    }

    #[test]
    fn test_symbol_match_when_no_id_matches() {
        // "btc" is nobody's id, so the symbol tier resolves it.
        let resolved = resolve_in_catalog(&catalog(), "btc").unwrap();
        assert_eq!(resolved.id, "bitcoin");
    }

    #[test]
    fn test_id_beats_symbol() {
        let resolved = resolve_in_catalog(&catalog(), "solana").unwrap();
        assert_eq!(resolved.symbol, "sol");
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let resolved = resolve_in_catalog(&catalog(), "bTc LiGhTnInG").unwrap();
        assert_eq!(resolved.id, "btc-lightning");
    }

    #[test]
    fn test_unknown_term_resolves_to_none() {
        assert!(resolve_in_catalog(&catalog(), "dogwifhat").is_none());
    }
}
