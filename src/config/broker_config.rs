//! Alpaca connection settings parsed from environment variables.

use crate::infrastructure::alpaca::environment::{
    AccountMode, Credentials, DATA_API_URL, LIVE_API_URL, PAPER_API_URL,
};
use crate::infrastructure::alpaca::AlpacaClient;
use crate::infrastructure::feed_store::FileFeedStore;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Alpaca API configuration
#[derive(Clone, Default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret_key: String,
    /// OAuth access token; preferred over the key pair when set.
    pub access_token: String,
    pub paper: bool,
    pub timeout_secs: u64,
    pub data_timeout_secs: u64,
    pub feed_store_path: Option<PathBuf>,
    pub live_url: String,
    pub paper_url: String,
    pub data_url: String,
}

impl std::fmt::Debug for AlpacaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaConfig")
            .field("api_key_set", &!self.api_key.is_empty())
            .field("access_token_set", &!self.access_token.is_empty())
            .field("paper", &self.paper)
            .field("timeout_secs", &self.timeout_secs)
            .field("data_timeout_secs", &self.data_timeout_secs)
            .field("feed_store_path", &self.feed_store_path)
            .field("live_url", &self.live_url)
            .field("paper_url", &self.paper_url)
            .field("data_url", &self.data_url)
            .finish()
    }
}

impl AlpacaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            api_key: var("ALPACA_API_KEY").unwrap_or_default(),
            secret_key: var("ALPACA_SECRET_KEY").unwrap_or_default(),
            access_token: var("ALPACA_ACCESS_TOKEN").unwrap_or_default(),
            paper: var("ALPACA_PAPER")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .unwrap_or(true),
            timeout_secs: var("ALPACA_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u64>()
                .unwrap_or(10),
            data_timeout_secs: var("ALPACA_DATA_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u64>()
                .unwrap_or(10),
            feed_store_path: var("ALPACA_FEED_STORE").map(PathBuf::from),
            live_url: var("ALPACA_LIVE_URL").unwrap_or_else(|| LIVE_API_URL.to_string()),
            paper_url: var("ALPACA_PAPER_URL").unwrap_or_else(|| PAPER_API_URL.to_string()),
            data_url: var("ALPACA_DATA_URL").unwrap_or_else(|| DATA_API_URL.to_string()),
        }
    }

    pub fn mode(&self) -> AccountMode {
        if self.paper {
            AccountMode::Paper
        } else {
            AccountMode::Live
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        if !self.access_token.is_empty() {
            return Ok(Credentials::bearer(&self.access_token));
        }
        if self.api_key.is_empty() || self.secret_key.is_empty() {
            anyhow::bail!(
                "No Alpaca credentials: set ALPACA_ACCESS_TOKEN or both ALPACA_API_KEY and ALPACA_SECRET_KEY"
            );
        }
        Ok(Credentials::key_secret(&self.api_key, &self.secret_key))
    }

    pub fn feed_store(&self) -> Result<FileFeedStore> {
        match &self.feed_store_path {
            Some(path) => Ok(FileFeedStore::new(path.clone())),
            None => FileFeedStore::default_location().context("Failed to locate feed store"),
        }
    }

    /// Client over the real HTTP transport with a persisted feed memory.
    pub fn build_client(&self) -> Result<AlpacaClient> {
        let credentials = self.credentials()?;
        let feed_store = self.feed_store()?;

        Ok(AlpacaClient::builder(credentials)
            .mode(self.mode())
            .live_url(&self.live_url)
            .paper_url(&self.paper_url)
            .data_url(&self.data_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .data_timeout(Duration::from_secs(self.data_timeout_secs))
            .feed_store(Arc::new(feed_store))
            .build())
    }
}
