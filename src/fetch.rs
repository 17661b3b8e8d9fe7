//! Fetchers used to resolve lazily loaded elements.
//!
//! The responsive engine only knows the [`Fetcher`] trait; the default
//! [`HttpFetcher`] is a blocking reqwest client with timeouts and a short retry
//! for transient failures (5xx / network errors).

use ahash::AHashMap;
use log::debug;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ChartError, Result};

/// Source of lazy-load payloads.
pub trait Fetcher {
    /// Body of `url` as text.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// Body of `url` parsed as JSON.
    fn fetch_json(&self, url: &str) -> Result<Value> {
        let body = self.fetch_text(url)?;
        serde_json::from_str(&body).map_err(|e| ChartError::Fetch {
            url: url.to_string(),
            reason: format!("decode json: {e}"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: HttpClient,
    backoff_ms: Vec<u64>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("trace-charts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChartError::Fetch {
                url: String::new(),
                reason: format!("client build: {e}"),
            })?;
        Ok(Self {
            http,
            backoff_ms: vec![100, 300, 700],
        })
    }

    /// Replace the retry schedule (one attempt per entry).
    pub fn with_backoff(mut self, backoff_ms: Vec<u64>) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let fail = |reason: String| ChartError::Fetch {
            url: url.to_string(),
            reason,
        };
        let mut last_err = String::from("no attempt made");
        for backoff_ms in &self.backoff_ms {
            debug!("GET {url}");
            match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => {
                    return r.text().map_err(|e| fail(format!("read body: {e}")));
                }
                Ok(r) if r.status().is_server_error() => {
                    last_err = format!("HTTP {}", r.status());
                }
                Ok(r) => return Err(fail(format!("request failed with HTTP {}", r.status()))),
                Err(e) => last_err = e.to_string(),
            }
            std::thread::sleep(Duration::from_millis(*backoff_ms));
        }
        Err(fail(format!("network error: {last_err}")))
    }
}

/// In-memory fetcher keyed by URL, for offline hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: AHashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<String>) -> Self {
        self.responses.insert(url.to_string(), body.into());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.responses.get(url).cloned().ok_or_else(|| ChartError::Fetch {
            url: url.to_string(),
            reason: "not found".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_fetcher_serves_json() {
        let f = StaticFetcher::new().with("/data.json", r#"[{"label":"a","value":1}]"#);
        let v = f.fetch_json("/data.json").unwrap();
        assert_eq!(v[0]["label"], "a");
        assert!(matches!(f.fetch_text("/missing"), Err(ChartError::Fetch { .. })));
    }

    #[test]
    fn invalid_json_is_a_fetch_error() {
        let f = StaticFetcher::new().with("/x", "not json");
        assert!(matches!(f.fetch_json("/x"), Err(ChartError::Fetch { .. })));
    }
}
