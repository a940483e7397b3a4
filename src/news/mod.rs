//! Crypto news aggregation over two independent providers.
//!
//! CryptoCompare authenticates through a header, NewsAPI through a
//! query-string key. The two fetches run concurrently; one provider failing
//! degrades to an empty list from that side only, both failing propagates
//! [`Error::NewsUnavailable`]. The merged, deduplicated response is cached
//! for five minutes.

use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::utils::cache::{Clock, TtlCache};
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::{Error, Result};

const TRENDING_TOPIC_COUNT: usize = 5;
const MIN_TOPIC_WORD_LEN: usize = 4;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "this", "that", "with", "from", "have", "will", "been", "were", "they", "their", "would",
        "could", "should", "about", "after", "before", "which", "while", "where", "when", "what",
        "your", "more", "than", "then", "them", "there", "here", "into", "over", "under", "also",
        "just", "like", "some", "such", "only", "most", "much", "many", "very", "says", "said",
        "news", "today", "week", "year", "market", "price", "crypto", "cryptocurrency",
    ]
    .into_iter()
    .collect();
}

/// A normalized news article from either provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub sentiment: Option<String>,
}

/// Aggregated, deduplicated news with trending terms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub articles: Vec<NewsArticle>,
    pub total_results: usize,
    pub last_updated: DateTime<Utc>,
    pub trending_topics: Vec<String>,
}

pub struct NewsAggregator {
    http: reqwest::Client,
    config: crate::config::NewsConfig,
    cache: TtlCache<NewsResponse>,
    retry: RetryPolicy,
}

impl NewsAggregator {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(crate::utils::cache::SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.runtime.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config: config.news.clone(),
            cache: TtlCache::with_clock(Duration::from_secs(config.news.cache_ttl_secs), clock),
            retry: RetryPolicy {
                max_attempts: config.runtime.max_retries,
                base_delay: Duration::from_millis(config.runtime.retry_base_delay_ms),
                attempt_timeout: Duration::from_secs(config.runtime.request_timeout_secs),
            },
        })
    }

    /// Aggregated news, served from cache when younger than the TTL.
    pub async fn get_all_news(&self) -> Result<NewsResponse> {
        self.cache
            .get_or_refresh(|| async {
                let (cryptocompare, newsapi) =
                    tokio::join!(self.fetch_cryptocompare(), self.fetch_newsapi());

                let (cc_articles, cc_err) = flatten_source("cryptocompare", cryptocompare);
                let (na_articles, na_err) = flatten_source("newsapi", newsapi);

                if let (Some(cc), Some(na)) = (&cc_err, &na_err) {
                    return Err(Error::NewsUnavailable(format!(
                        "cryptocompare: {}; newsapi: {}",
                        cc, na
                    )));
                }

                let mut articles = cc_articles;
                articles.extend(na_articles);
                Ok(aggregate(articles, Utc::now()))
            })
            .await
    }

    async fn fetch_cryptocompare(&self) -> Result<Vec<NewsArticle>> {
        let body = with_retry("cryptocompare_news", self.retry, || async {
            let mut request = self
                .http
                .get(&self.config.cryptocompare_url)
                .query(&[("lang", "EN")]);
            if !self.config.cryptocompare_api_key.is_empty() {
                request = request.header(
                    "authorization",
                    format!("Apikey {}", self.config.cryptocompare_api_key),
                );
            }
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(Error::DataError(format!(
                    "cryptocompare returned status {}",
                    response.status()
                )));
            }
            Ok(response.json::<Value>().await?)
        })
        .await?;

        let items = body
            .get("Data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                let published = item.get("published_on").and_then(Value::as_i64)?;
                Some(NewsArticle {
                    title: item.get("title")?.as_str()?.to_string(),
                    summary: item
                        .get("body")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    source: item
                        .pointer("/source_info/name")
                        .and_then(Value::as_str)
                        .unwrap_or("CryptoCompare")
                        .to_string(),
                    url: item.get("url")?.as_str()?.to_string(),
                    published_at: Utc.timestamp_opt(published, 0).single()?,
                    categories: item
                        .get("categories")
                        .and_then(Value::as_str)
                        .map(|c| c.split('|').map(str::to_string).collect())
                        .unwrap_or_default(),
                    sentiment: None,
                })
            })
            .collect())
    }

    async fn fetch_newsapi(&self) -> Result<Vec<NewsArticle>> {
        let body = with_retry("newsapi_everything", self.retry, || async {
            let response = self
                .http
                .get(&self.config.newsapi_url)
                .query(&[
                    ("q", self.config.query.as_str()),
                    ("language", "en"),
                    ("sortBy", "publishedAt"),
                    ("pageSize", "50"),
                    ("apiKey", self.config.newsapi_api_key.as_str()),
                ])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Error::DataError(format!(
                    "newsapi returned status {}",
                    response.status()
                )));
            }
            Ok(response.json::<Value>().await?)
        })
        .await?;

        let items = body
            .get("articles")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                let published = item.get("publishedAt").and_then(Value::as_str)?;
                Some(NewsArticle {
                    title: item.get("title")?.as_str()?.to_string(),
                    summary: item
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    source: item
                        .pointer("/source/name")
                        .and_then(Value::as_str)
                        .unwrap_or("NewsAPI")
                        .to_string(),
                    url: item.get("url")?.as_str()?.to_string(),
                    published_at: published.parse::<DateTime<Utc>>().ok()?,
                    categories: vec![],
                    sentiment: None,
                })
            })
            .collect())
    }
}

fn flatten_source(
    name: &str,
    result: Result<Vec<NewsArticle>>,
) -> (Vec<NewsArticle>, Option<String>) {
    match result {
        Ok(articles) => {
            log::debug!("{} returned {} articles", name, articles.len());
            (articles, None)
        }
        Err(e) => {
            log::warn!("{} fetch failed, continuing without it: {}", name, e);
            (vec![], Some(e.to_string()))
        }
    }
}

/// Sort newest-first, drop duplicates (case-insensitive title or exact URL,
/// first occurrence in sorted order wins) and extract trending topics.
pub(crate) fn aggregate(mut articles: Vec<NewsArticle>, now: DateTime<Utc>) -> NewsResponse {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let mut seen_titles = HashSet::new();
    let mut seen_urls = HashSet::new();
    let mut deduped = Vec::new();
    for article in articles {
        let title_key = article.title.to_lowercase();
        if seen_titles.contains(&title_key) || seen_urls.contains(&article.url) {
            continue;
        }
        seen_titles.insert(title_key);
        seen_urls.insert(article.url.clone());
        deduped.push(article);
    }

    let trending_topics = trending_topics(&deduped);

    NewsResponse {
        total_results: deduped.len(),
        articles: deduped,
        last_updated: now,
        trending_topics,
    }
}

/// Top-5 most frequent words (length > 3, stop-word filtered) over title and
/// summary text. Ties break toward the word encountered first, which makes
/// the extraction deterministic for a given article order.
pub(crate) fn trending_topics(articles: &[NewsArticle]) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for article in articles {
        let text = format!("{} {}", article.title, article.summary);
        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if word.len() < MIN_TOPIC_WORD_LEN || STOP_WORDS.contains(word.as_str()) {
                continue;
            }
            let entry = counts.entry(word).or_insert_with(|| {
                order += 1;
                (0, order)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(TRENDING_TOPIC_COUNT)
        .map(|(word, _)| word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn article(title: &str, url: &str, summary: &str, age_mins: i64) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            summary: summary.to_string(),
            source: "test".to_string(),
            url: url.to_string(),
            published_at: Utc::now() - ChronoDuration::minutes(age_mins),
            categories: vec![],
            sentiment: None,
        }
    }

    #[test]
    fn test_dedupe_by_url_keeps_newer_entry() {
        let newer = article("Solana Hits New High", "https://x.test/a", "", 5);
        let older = article("SOLANA HITS NEW HIGH", "https://x.test/a", "", 60);
        let response = aggregate(vec![older, newer], Utc::now());

        assert_eq!(response.total_results, 1);
        // The newer article sorts first, so its casing survives.
        assert_eq!(response.articles[0].title, "Solana Hits New High");
    }

    #[test]
    fn test_dedupe_by_case_insensitive_title() {
        let a = article("Validator Outage Update", "https://x.test/1", "", 5);
        let b = article("validator outage update", "https://y.test/2", "", 10);
        let response = aggregate(vec![a, b], Utc::now());

        assert_eq!(response.total_results, 1);
        assert_eq!(response.articles[0].url, "https://x.test/1");
    }

    #[test]
    fn test_sorted_newest_first() {
        let old = article("old story", "https://x.test/old", "", 120);
        let new = article("new story", "https://x.test/new", "", 1);
        let response = aggregate(vec![old, new], Utc::now());

        assert_eq!(response.articles[0].title, "new story");
        assert_eq!(response.articles[1].title, "old story");
    }

    #[test]
    fn test_trending_topics_filters_and_ranks() {
        let articles = vec![
            article(
                "Validator upgrade lands",
                "https://x.test/1",
                "validator performance improves",
                1,
            ),
            article(
                "Validator incident postmortem",
                "https://x.test/2",
                "the outage hit validator operators",
                2,
            ),
        ];
        let topics = trending_topics(&articles);

        assert_eq!(topics[0], "validator"); // 4 occurrences
        assert!(topics.iter().all(|w| w.len() >= MIN_TOPIC_WORD_LEN));
        assert!(!topics.contains(&"the".to_string()));
        assert!(topics.len() <= TRENDING_TOPIC_COUNT);
    }

    #[test]
    fn test_trending_topics_idempotent() {
        let articles = vec![
            article("alpha beta gamma delta", "https://x.test/1", "alpha beta", 1),
            article("beta gamma epsilon", "https://x.test/2", "gamma zeta", 2),
        ];
        let first = trending_topics(&articles);
        let second = trending_topics(&articles);
        assert_eq!(first, second);
    }
}
