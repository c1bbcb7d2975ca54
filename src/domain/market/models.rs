use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1Min")]
    OneMin,
    #[serde(rename = "5Min")]
    FiveMin,
    #[serde(rename = "15Min")]
    FifteenMin,
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "1D")]
    OneDay,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1Min",
            Timeframe::FiveMin => "5Min",
            Timeframe::FifteenMin => "15Min",
            Timeframe::OneHour => "1H",
            Timeframe::OneDay => "1D",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1Min" => Ok(Timeframe::OneMin),
            "5Min" => Ok(Timeframe::FiveMin),
            "15Min" => Ok(Timeframe::FifteenMin),
            "1H" | "1Hour" => Ok(Timeframe::OneHour),
            "1D" | "1Day" => Ok(Timeframe::OneDay),
            _ => anyhow::bail!("Invalid timeframe: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "n", default)]
    pub trade_count: f64,
    #[serde(rename = "vw", default)]
    pub vwap: f64,
}

/// Equity NBBO quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "bx", default)]
    pub bid_exchange: String,
    #[serde(rename = "bp")]
    pub bid_price: f64,
    #[serde(rename = "bs", default)]
    pub bid_size: i64,
    #[serde(rename = "ax", default)]
    pub ask_exchange: String,
    #[serde(rename = "ap")]
    pub ask_price: f64,
    #[serde(rename = "as", default)]
    pub ask_size: i64,
    #[serde(rename = "c", default)]
    pub conditions: Vec<String>,
    #[serde(rename = "z", default)]
    pub tape: String,
}

impl Quote {
    pub fn mid_price(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }
}

/// Option quote; conditions arrive as a single code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "bx", default)]
    pub bid_exchange: String,
    #[serde(rename = "bp")]
    pub bid_price: f64,
    #[serde(rename = "bs", default)]
    pub bid_size: i64,
    #[serde(rename = "ax", default)]
    pub ask_exchange: String,
    #[serde(rename = "ap")]
    pub ask_price: f64,
    #[serde(rename = "as", default)]
    pub ask_size: i64,
    #[serde(rename = "c", default)]
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "x", default)]
    pub exchange: String,
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "s")]
    pub size: i64,
    #[serde(rename = "c", default)]
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub daily_bar: Bar,
    pub latest_quote: Quote,
    pub minute_bar: Bar,
    pub prev_daily_bar: Bar,
}

impl Snapshot {
    /// Change since the previous session close, in percent.
    pub fn change_pct(&self) -> Option<f64> {
        let prev = self.prev_daily_bar.close;
        if prev == 0.0 {
            return None;
        }
        Some((self.daily_bar.close - prev) / prev * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSnapshot {
    #[serde(default)]
    pub latest_trade: Option<Trade>,
    pub latest_quote: OptionQuote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsImage {
    pub size: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub headline: String,
    #[serde(default)]
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<NewsImage>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub source: String,
}

impl News {
    fn image(&self, size: &str) -> Option<&str> {
        self.images
            .iter()
            .find(|image| image.size == size)
            .map(|image| image.url.as_str())
    }

    pub fn thumb(&self) -> Option<&str> {
        self.image("thumb")
    }

    pub fn small(&self) -> Option<&str> {
        self.image("small")
    }

    pub fn large(&self) -> Option<&str> {
        self.image("large")
    }
}
