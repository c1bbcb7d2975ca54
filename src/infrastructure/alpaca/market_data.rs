use super::feed_fallback::FeedFallback;
use super::rest::RestClient;
use crate::domain::errors::Result;
use crate::domain::market::{
    Bar, EquityFeed, News, OptionFeed, OptionQuote, OptionSnapshot, Quote, Snapshot,
    SortDirection, Timeframe, Trade,
};
use crate::domain::ports::FeedStore;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Params = Vec<(&'static str, Option<String>)>;

fn iso8601(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Paging window shared by the historical bars and trades endpoints.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub page_token: Option<String>,
    pub sort: Option<SortDirection>,
}

impl HistoryQuery {
    fn params(&self) -> Params {
        vec![
            ("start", iso8601(self.start)),
            ("end", iso8601(self.end)),
            ("limit", self.limit.map(|limit| limit.to_string())),
            ("page_token", self.page_token.clone()),
            ("sort", self.sort.map(|sort| sort.as_str().to_string())),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuotesQuery {
    pub currency: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub asof: Option<DateTime<Utc>>,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsQuery {
    pub symbols: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub sort: Option<SortDirection>,
    pub limit: Option<u32>,
    pub include_content: Option<bool>,
    pub exclude_contentless: Option<bool>,
    pub page_token: Option<String>,
}

/// Market-data endpoints. Equity and option lookups go through the feed
/// fallback chain; bulk lookups come back empty when every tier fails,
/// single-symbol lookups return the last tier's error.
#[derive(Clone)]
pub struct AlpacaDataClient {
    rest: RestClient,
    fallback: FeedFallback,
}

impl AlpacaDataClient {
    pub fn new(rest: RestClient, store: Arc<dyn FeedStore>) -> Self {
        Self {
            rest,
            fallback: FeedFallback::new(store),
        }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn fallback(&self) -> &FeedFallback {
        &self.fallback
    }

    // ===== Equities =====

    pub async fn bars(
        &self,
        timeframe: Timeframe,
        symbols: &[&str],
        query: &HistoryQuery,
        feed: Option<EquityFeed>,
    ) -> HashMap<String, Vec<Bar>> {
        let rest = &self.rest;
        let symbols = symbols.join(",");

        self.fallback
            .fetch_bulk(feed, |tier: EquityFeed| {
                let mut params = vec![
                    ("symbols", Some(symbols.clone())),
                    ("timeframe", Some(timeframe.to_string())),
                    ("feed", Some(tier.to_string())),
                    ("adjustment", Some("all".to_string())),
                ];
                params.extend(query.params());
                async move { rest.get("stocks/bars", &params).await }
            })
            .await
    }

    pub async fn symbol_bars(
        &self,
        timeframe: Timeframe,
        symbol: &str,
        query: &HistoryQuery,
    ) -> Vec<Bar> {
        self.bars(timeframe, &[symbol], query, None)
            .await
            .remove(symbol)
            .unwrap_or_default()
    }

    pub async fn latest_bars(
        &self,
        symbols: &[&str],
        feed: Option<EquityFeed>,
    ) -> HashMap<String, Bar> {
        let rest = &self.rest;
        let symbols = symbols.join(",");

        self.fallback
            .fetch_bulk(feed, |tier: EquityFeed| {
                let params = vec![
                    ("symbols", Some(symbols.clone())),
                    ("feed", Some(tier.to_string())),
                ];
                async move { rest.get("stocks/bars/latest", &params).await }
            })
            .await
    }

    pub async fn quotes(
        &self,
        symbol: &str,
        query: &QuotesQuery,
        feed: Option<EquityFeed>,
    ) -> Result<Vec<Quote>> {
        let rest = &self.rest;
        let path = format!("stocks/{}/quotes", symbol);
        let path = path.as_str();

        self.fallback
            .fetch_single(feed, |tier: EquityFeed| {
                let params = vec![
                    ("feed", Some(tier.to_string())),
                    ("currency", query.currency.clone()),
                    ("start", iso8601(query.start)),
                    ("end", iso8601(query.end)),
                    ("limit", query.limit.map(|limit| limit.to_string())),
                    ("asof", iso8601(query.asof)),
                    ("sort", query.sort.map(|sort| sort.as_str().to_string())),
                ];
                async move { rest.get(path, &params).await }
            })
            .await
    }

    /// Latest NBBO quote for one symbol.
    pub async fn quote(
        &self,
        symbol: &str,
        currency: Option<&str>,
        feed: Option<EquityFeed>,
    ) -> Result<Quote> {
        let rest = &self.rest;
        let path = format!("stocks/{}/quotes/latest", symbol);
        let path = path.as_str();

        self.fallback
            .fetch_single(feed, |tier: EquityFeed| {
                let params = vec![
                    ("feed", Some(tier.to_string())),
                    ("currency", currency.map(str::to_string)),
                ];
                async move { rest.get(path, &params).await }
            })
            .await
    }

    pub async fn snapshot(
        &self,
        symbol: &str,
        currency: Option<&str>,
        feed: Option<EquityFeed>,
    ) -> Result<Snapshot> {
        let rest = &self.rest;
        let path = format!("stocks/{}/snapshot", symbol);
        let path = path.as_str();

        self.fallback
            .fetch_single(feed, |tier: EquityFeed| {
                let params = vec![
                    ("feed", Some(tier.to_string())),
                    ("currency", currency.map(str::to_string)),
                ];
                async move { rest.get(path, &params).await }
            })
            .await
    }

    // ===== Options =====

    pub async fn option_bars(
        &self,
        symbols: &[&str],
        timeframe: Timeframe,
        query: &HistoryQuery,
    ) -> Result<HashMap<String, Vec<Bar>>> {
        let mut params = vec![
            ("symbols", Some(symbols.join(","))),
            ("timeframe", Some(timeframe.to_string())),
        ];
        params.extend(query.params());
        self.rest.get("options/bars", &params).await
    }

    pub async fn option_trades(
        &self,
        symbols: &[&str],
        query: &HistoryQuery,
    ) -> Result<HashMap<String, Vec<Trade>>> {
        let mut params = vec![("symbols", Some(symbols.join(",")))];
        params.extend(query.params());
        self.rest.get("options/trades", &params).await
    }

    /// Exchange code to exchange name.
    pub async fn option_exchanges(&self) -> Result<HashMap<String, String>> {
        self.rest.get("options/meta/exchanges", &[]).await
    }

    pub async fn option_latest_quotes(
        &self,
        symbols: &[&str],
        feed: Option<OptionFeed>,
    ) -> HashMap<String, OptionQuote> {
        self.option_bulk("options/quotes/latest", symbols, feed).await
    }

    pub async fn option_latest_trades(
        &self,
        symbols: &[&str],
        feed: Option<OptionFeed>,
    ) -> HashMap<String, Trade> {
        self.option_bulk("options/trades/latest", symbols, feed).await
    }

    pub async fn option_snapshots(
        &self,
        symbols: &[&str],
        feed: Option<OptionFeed>,
    ) -> HashMap<String, OptionSnapshot> {
        self.option_bulk("options/snapshots", symbols, feed).await
    }

    /// Snapshot of one contract, taken from the bulk call.
    pub async fn option_snapshot(&self, symbol: &str) -> Option<OptionSnapshot> {
        let mut snapshots = self.option_snapshots(&[symbol], None).await;
        if snapshots.is_empty() {
            debug!("AlpacaDataClient: no snapshot for {}", symbol);
        }
        snapshots.remove(symbol)
    }

    /// Every contract snapshot for an underlying, keyed by contract symbol.
    pub async fn option_chain(
        &self,
        underlying: &str,
        feed: Option<OptionFeed>,
    ) -> HashMap<String, OptionSnapshot> {
        let rest = &self.rest;
        let path = format!("options/snapshots/{}", underlying);
        let path = path.as_str();

        self.fallback
            .fetch_bulk(feed, |tier: OptionFeed| {
                let params = vec![("feed", Some(tier.to_string()))];
                async move { rest.get(path, &params).await }
            })
            .await
    }

    async fn option_bulk<T>(
        &self,
        path: &'static str,
        symbols: &[&str],
        feed: Option<OptionFeed>,
    ) -> HashMap<String, T>
    where
        T: serde::de::DeserializeOwned,
    {
        let rest = &self.rest;
        let symbols = symbols.join(",");

        self.fallback
            .fetch_bulk(feed, |tier: OptionFeed| {
                let params = vec![
                    ("symbols", Some(symbols.clone())),
                    ("feed", Some(tier.to_string())),
                ];
                async move { rest.get(path, &params).await }
            })
            .await
    }

    // ===== News =====

    pub async fn news(&self, query: &NewsQuery) -> Result<Vec<News>> {
        let symbols = (!query.symbols.is_empty()).then(|| query.symbols.join(","));
        let params = vec![
            ("start", iso8601(query.start)),
            ("end", iso8601(query.end)),
            ("sort", query.sort.map(|sort| sort.as_str().to_string())),
            ("symbols", symbols),
            ("limit", query.limit.map(|limit| limit.to_string())),
            ("include_content", query.include_content.map(|v| v.to_string())),
            (
                "exclude_contentless",
                query.exclude_contentless.map(|v| v.to_string()),
            ),
            ("page_token", query.page_token.clone()),
        ];
        self.rest.get("news", &params).await
    }
}
