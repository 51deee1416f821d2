//! # pipeweave-search
//!
//! Bulk DuckDuckGo search with a per-query retry loop. Failures degrade:
//! a query that still fails after the last retry is recorded with an
//! empty result list, never propagated. Between attempts the client
//! sleeps a linearly increasing amount, and after each successful query a
//! short random pause keeps the request rate polite.

mod html;

use pipeweave_core::PipeError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// DuckDuckGo HTML search endpoint.
const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Browser user agent; the HTML endpoint rejects obvious bots.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// One search result record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Tunables for the search client. Type-checked only, no range validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_results() -> usize {
    5
}

fn default_region() -> String {
    "tw".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            region: default_region(),
            max_retries: default_max_retries(),
        }
    }
}

/// Outcome of one query after the retry loop.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub hits: Vec<SearchHit>,
    /// Attempts actually made (1 on first-try success).
    pub attempts: u32,
    /// True when every attempt failed and the hits were recorded empty.
    pub exhausted: bool,
}

/// Web search client.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    options: SearchOptions,
    endpoint: String,
}

impl SearchClient {
    pub fn new(options: SearchOptions) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            options,
            endpoint: DUCKDUCKGO_HTML_URL.to_string(),
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Override the search endpoint, e.g. to point at a self-hosted
    /// DuckDuckGo-compatible mirror.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Single search attempt, no retries.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PipeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query), ("kl", self.options.region.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipeError::search(format!(
                "search returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(html::parse_results(&body, self.options.max_results))
    }

    /// One query through the retry loop: wait `2 * retry` seconds before
    /// each retry, give up after `max_retries` attempts.
    pub async fn search_with_retry(&self, query: &str) -> QueryOutcome {
        let max_retries = self.options.max_retries.max(1);
        for retry in 0..max_retries {
            if retry > 0 {
                let wait = Duration::from_secs(u64::from(2 * retry));
                tracing::debug!(query, retry, ?wait, "retrying search");
                tokio::time::sleep(wait).await;
            }
            match self.search(query).await {
                Ok(hits) => {
                    tracing::debug!(query, hits = hits.len(), "search succeeded");
                    // Politeness pause between successful queries.
                    let pause = rand::thread_rng().gen_range(0.0..0.5);
                    tokio::time::sleep(Duration::from_secs_f64(pause)).await;
                    return QueryOutcome {
                        hits,
                        attempts: retry + 1,
                        exhausted: false,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        query,
                        attempt = retry + 1,
                        max_retries,
                        error = %e,
                        "search attempt failed"
                    );
                }
            }
        }
        tracing::warn!(query, max_retries, "all search attempts failed");
        QueryOutcome {
            hits: Vec::new(),
            attempts: max_retries,
            exhausted: true,
        }
    }

    /// Run every query through the retry loop, in order, mapping each
    /// query to its (possibly empty) results.
    pub async fn bulk_search(&self, queries: &[String]) -> HashMap<String, Vec<SearchHit>> {
        let mut all = HashMap::new();
        for query in queries {
            let outcome = self.search_with_retry(query).await;
            all.insert(query.clone(), outcome.hits);
        }
        all
    }
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = SearchOptions::default();
        assert_eq!(options.max_results, 5);
        assert_eq!(options.region, "tw");
        assert_eq!(options.max_retries, 3);

        let parsed: SearchOptions = serde_json::from_str(r#"{"max_results":8}"#).unwrap();
        assert_eq!(parsed.max_results, 8);
        assert_eq!(parsed.max_retries, 3);
    }

    fn unreachable_client() -> SearchClient {
        let mut client = SearchClient::new(SearchOptions::default());
        client.endpoint = "http://127.0.0.1:1/html/".to_string();
        client
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_query_degrades_to_empty() {
        // Paused time fast-forwards through the retry sleeps.
        let client = unreachable_client();
        let outcome = client.search_with_retry("ddr4 density").await;
        assert!(outcome.exhausted);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.hits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_search_records_every_query() {
        let client = unreachable_client();
        let queries = vec!["q1".to_string(), "q2".to_string()];
        let all = client.bulk_search(&queries).await;
        assert_eq!(all.len(), 2);
        assert!(all["q1"].is_empty());
        assert!(all["q2"].is_empty());
    }
}
