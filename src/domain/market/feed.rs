use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset family whose data feeds form one fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFamily {
    Equities,
    Options,
}

impl FeedFamily {
    /// Key under which the last successful tier is persisted.
    pub fn store_key(&self) -> &'static str {
        match self {
            FeedFamily::Equities => "feed",
            FeedFamily::Options => "options_feed",
        }
    }
}

impl fmt::Display for FeedFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_key())
    }
}

/// A data-feed entitlement tier. `chain()` lists the family's tiers in
/// strict priority order; the first entry is the default.
pub trait DataFeed:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static
{
    const FAMILY: FeedFamily;

    fn chain() -> &'static [Self];

    fn as_str(&self) -> &'static str;

    /// Tiers from `self` to the end of the chain, `self` included.
    fn fallback_chain(self) -> &'static [Self] {
        let chain = Self::chain();
        let start = chain.iter().position(|tier| *tier == self).unwrap_or(0);
        &chain[start..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquityFeed {
    /// Consolidated tape (all US exchanges)
    Sip,
    Iex,
    Otc,
}

impl DataFeed for EquityFeed {
    const FAMILY: FeedFamily = FeedFamily::Equities;

    fn chain() -> &'static [Self] {
        &[EquityFeed::Sip, EquityFeed::Iex, EquityFeed::Otc]
    }

    fn as_str(&self) -> &'static str {
        match self {
            EquityFeed::Sip => "sip",
            EquityFeed::Iex => "iex",
            EquityFeed::Otc => "otc",
        }
    }
}

impl fmt::Display for EquityFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquityFeed {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sip" => Ok(EquityFeed::Sip),
            "iex" => Ok(EquityFeed::Iex),
            "otc" => Ok(EquityFeed::Otc),
            _ => anyhow::bail!("Invalid equity feed: {}. Must be 'sip', 'iex' or 'otc'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionFeed {
    Opra,
    Indicative,
}

impl DataFeed for OptionFeed {
    const FAMILY: FeedFamily = FeedFamily::Options;

    fn chain() -> &'static [Self] {
        &[OptionFeed::Opra, OptionFeed::Indicative]
    }

    fn as_str(&self) -> &'static str {
        match self {
            OptionFeed::Opra => "opra",
            OptionFeed::Indicative => "indicative",
        }
    }
}

impl fmt::Display for OptionFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionFeed {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opra" => Ok(OptionFeed::Opra),
            "indicative" => Ok(OptionFeed::Indicative),
            _ => anyhow::bail!("Invalid option feed: {}. Must be 'opra' or 'indicative'", s),
        }
    }
}
