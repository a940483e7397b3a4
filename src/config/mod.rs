//! Configuration management for the analytics toolbox.
//!
//! All endpoint URLs and API keys are carried in an explicit [`Config`]
//! passed to each client at construction time; nothing reads the environment
//! ambiently. `from_env` exists as a convenience for the binary, mapping the
//! documented variables into the same struct.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

/// Main configuration structure for the analytics toolbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain RPC settings
    pub chain: ChainConfig,
    /// Market data provider settings
    pub market: MarketConfig,
    /// News provider settings
    pub news: NewsConfig,
    /// Runtime knobs shared across clients
    pub runtime: RuntimeConfig,
}

/// Chain RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Commitment level for reads ("processed", "confirmed", "finalized")
    pub commitment: String,
}

/// Market data (CoinGecko) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// REST base URL
    pub base_url: String,
    /// Identifier catalog cache TTL in seconds
    pub catalog_ttl_secs: u64,
}

/// News aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// CryptoCompare article endpoint (API key sent via header)
    pub cryptocompare_url: String,
    pub cryptocompare_api_key: String,
    /// NewsAPI endpoint (API key sent via query string)
    pub newsapi_url: String,
    pub newsapi_api_key: String,
    /// Search query for the keyword-driven provider
    pub query: String,
    /// Aggregated response cache TTL in seconds
    pub cache_ttl_secs: u64,
}

/// Knobs shared by every client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Retry budget per network call
    pub max_retries: usize,
    /// Linear backoff unit in milliseconds
    pub retry_base_delay_ms: u64,
    /// Per-attempt deadline in seconds
    pub request_timeout_secs: u64,
    /// Maximum concurrently in-flight calls in a fan-out
    pub fanout_limit: usize,
    /// Transfers above this SOL amount are flagged as whale activity
    pub whale_threshold_sol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: ChainConfig {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                commitment: "confirmed".to_string(),
            },
            market: MarketConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
                catalog_ttl_secs: 3600,
            },
            news: NewsConfig {
                cryptocompare_url: "https://min-api.cryptocompare.com/data/v2/news/".to_string(),
                cryptocompare_api_key: String::new(),
                newsapi_url: "https://newsapi.org/v2/everything".to_string(),
                newsapi_api_key: String::new(),
                query: "solana OR crypto".to_string(),
                cache_ttl_secs: 300,
            },
            runtime: RuntimeConfig {
                max_retries: 3,
                retry_base_delay_ms: 1000,
                request_timeout_secs: 30,
                fanout_limit: 8,
                whale_threshold_sol: 100.0,
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(url) = env::var("SOLSIGHT_RPC_URL") {
            config.chain.rpc_url = url;
        }
        if let Ok(commitment) = env::var("SOLSIGHT_COMMITMENT") {
            config.chain.commitment = commitment;
        }
        if let Ok(url) = env::var("COINGECKO_BASE_URL") {
            config.market.base_url = url;
        }
        if let Ok(url) = env::var("CRYPTOCOMPARE_URL") {
            config.news.cryptocompare_url = url;
        }
        if let Ok(key) = env::var("CRYPTOCOMPARE_API_KEY") {
            config.news.cryptocompare_api_key = key;
        }
        if let Ok(url) = env::var("NEWSAPI_URL") {
            config.news.newsapi_url = url;
        }
        if let Ok(key) = env::var("NEWSAPI_API_KEY") {
            config.news.newsapi_api_key = key;
        }
        if let Ok(query) = env::var("SOLSIGHT_NEWS_QUERY") {
            config.news.query = query;
        }
        if let Ok(limit) = env::var("SOLSIGHT_FANOUT_LIMIT") {
            if let Ok(limit) = limit.parse() {
                config.runtime.fanout_limit = limit;
            }
        }
        config
    }

    /// Get the default configuration as a TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chain.commitment, "confirmed");
        assert_eq!(config.market.catalog_ttl_secs, 3600);
        assert_eq!(config.news.cache_ttl_secs, 300);
        assert_eq!(config.runtime.max_retries, 3);
        assert_eq!(config.runtime.fanout_limit, 8);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        // Save config
        config.save_to_file(path).unwrap();

        // Load config
        let loaded_config = Config::from_file(path).unwrap();

        assert_eq!(config.chain.rpc_url, loaded_config.chain.rpc_url);
        assert_eq!(config.news.query, loaded_config.news.query);
        assert_eq!(
            config.runtime.whale_threshold_sol,
            loaded_config.runtime.whale_threshold_sol
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SOLSIGHT_RPC_URL", Some("http://localhost:8899")),
                ("CRYPTOCOMPARE_URL", Some("http://localhost:9001/news")),
                ("NEWSAPI_URL", Some("http://localhost:9002/everything")),
                ("NEWSAPI_API_KEY", Some("test-key")),
                ("SOLSIGHT_FANOUT_LIMIT", Some("4")),
            ],
            || {
                let config = Config::from_env();
                assert_eq!(config.chain.rpc_url, "http://localhost:8899");
                assert_eq!(config.news.cryptocompare_url, "http://localhost:9001/news");
                assert_eq!(config.news.newsapi_url, "http://localhost:9002/everything");
                assert_eq!(config.news.newsapi_api_key, "test-key");
                assert_eq!(config.runtime.fanout_limit, 4);
                // Unset vars keep defaults
                assert_eq!(config.chain.commitment, "confirmed");
            },
        );
    }

    #[test]
    fn test_default_toml() {
        let toml = Config::default_toml();
        assert!(toml.contains("[chain]"));
        assert!(toml.contains("[market]"));
        assert!(toml.contains("[news]"));
        assert!(toml.contains("[runtime]"));
    }
}
