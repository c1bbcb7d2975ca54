use crate::domain::market::Timeframe;
use crate::domain::numeric::NumericString;
use crate::domain::trading::types::{AssetClass, OrderSide, wire_enum};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    #[serde(default)]
    pub account_number: String,
    pub status: String,
    #[serde(default)]
    pub currency: String,
    pub cash: NumericString<Decimal>,
    pub buying_power: NumericString<Decimal>,
    #[serde(default)]
    pub equity: Option<NumericString<Decimal>>,
    #[serde(default)]
    pub last_equity: Option<NumericString<Decimal>>,
    #[serde(default)]
    pub portfolio_value: Option<NumericString<Decimal>>,
    #[serde(default)]
    pub pattern_day_trader: bool,
    #[serde(default)]
    pub trading_blocked: bool,
    #[serde(default)]
    pub daytrade_count: i64,
    #[serde(default)]
    pub options_trading_level: Option<i64>,
}

impl Account {
    /// Equity change since the previous close.
    pub fn day_change(&self) -> Option<Decimal> {
        match (self.equity, self.last_equity) {
            (Some(equity), Some(last)) => Some(equity.value() - last.value()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    #[serde(rename = "class")]
    pub asset_class: AssetClass,
    pub exchange: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    pub tradable: bool,
    #[serde(default)]
    pub marginable: bool,
    #[serde(default)]
    pub shortable: bool,
    #[serde(default)]
    pub fractionable: bool,
}

/// A listed option contract. Prices and sizes arrive as numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub id: Uuid,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    pub tradable: bool,
    pub expiration_date: NaiveDate,
    #[serde(default)]
    pub root_symbol: String,
    pub underlying_symbol: String,
    #[serde(rename = "type")]
    pub contract_type: String,
    pub style: String,
    pub strike_price: NumericString<f64>,
    pub size: NumericString<u32>,
    #[serde(default)]
    pub open_interest: Option<NumericString<u64>>,
    #[serde(default)]
    pub close_price: Option<NumericString<f64>>,
}

impl OptionContract {
    /// Underlying price at which a call breaks even, using the last close.
    pub fn breakeven(&self) -> f64 {
        self.strike_price.value() + self.close_price.map(|p| p.value()).unwrap_or(0.0)
    }
}

/// One entry of a multi-status response (e.g. bulk order cancellation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiResponse<T> {
    pub id: Option<Uuid>,
    pub status: u16,
    pub body: Option<T>,
}

// ===== Activities =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityType {
    Fill,
    Trans,
    Misc,
    Acatc,
    Acats,
    Cfee,
    Csd,
    Csw,
    Div,
    Divcgl,
    Divcgs,
    Divfee,
    Divft,
    Divnra,
    Divroc,
    Divtw,
    Divtxex,
    Fee,
    Int,
    Intnra,
    Inttw,
    Jnl,
    Jnlc,
    Jnls,
    Ma,
    Nc,
    Opasn,
    Opexc,
    Opexp,
    Optrd,
    Ptc,
    Ptr,
    Reorg,
    Sc,
    Sso,
    Ssp,
}

wire_enum!(ActivityType {
    Fill => "FILL",
    Trans => "TRANS",
    Misc => "MISC",
    Acatc => "ACATC",
    Acats => "ACATS",
    Cfee => "CFEE",
    Csd => "CSD",
    Csw => "CSW",
    Div => "DIV",
    Divcgl => "DIVCGL",
    Divcgs => "DIVCGS",
    Divfee => "DIVFEE",
    Divft => "DIVFT",
    Divnra => "DIVNRA",
    Divroc => "DIVROC",
    Divtw => "DIVTW",
    Divtxex => "DIVTXEX",
    Fee => "FEE",
    Int => "INT",
    Intnra => "INTNRA",
    Inttw => "INTTW",
    Jnl => "JNL",
    Jnlc => "JNLC",
    Jnls => "JNLS",
    Ma => "MA",
    Nc => "NC",
    Opasn => "OPASN",
    Opexc => "OPEXC",
    Opexp => "OPEXP",
    Optrd => "OPTRD",
    Ptc => "PTC",
    Ptr => "PTR",
    Reorg => "REORG",
    Sc => "SC",
    Sso => "SSO",
    Ssp => "SSP",
});

impl ActivityType {
    pub fn description(&self) -> &'static str {
        match self {
            ActivityType::Fill => "Order fills (both partial and full fills)",
            ActivityType::Trans => "Cash transactions (both CSD and CSW)",
            ActivityType::Misc => {
                "Miscellaneous or rarely used activity types (All types except those in TRANS, DIV, or FILL)"
            }
            ActivityType::Acatc => "Automated Customer Account Transfer Cash",
            ActivityType::Acats => "Automated Customer Account Transfer Securities",
            ActivityType::Cfee => "Crypto fee",
            ActivityType::Csd => "Cash deposit (+)",
            ActivityType::Csw => "Cash withdrawal (-)",
            ActivityType::Div => "Dividends",
            ActivityType::Divcgl => "Dividend (capital gain long term)",
            ActivityType::Divcgs => "Dividend (capital gain short term)",
            ActivityType::Divfee => "Dividend fee",
            ActivityType::Divft => "Dividend adjusted (Foreign Tax Withheld)",
            ActivityType::Divnra => "Dividend adjusted (NRA Withheld)",
            ActivityType::Divroc => "Dividend return of capital",
            ActivityType::Divtw => "Dividend adjusted (Tefra Withheld)",
            ActivityType::Divtxex => "Dividend (tax exempt)",
            ActivityType::Fee => "Fee denominated in USD",
            ActivityType::Int => "Interest (credit/margin)",
            ActivityType::Intnra => "Interest adjusted (NRA withheld)",
            ActivityType::Inttw => "Interest adjusted (Tefra withheld)",
            ActivityType::Jnl => "Journal entry",
            ActivityType::Jnlc => "Journal entry (cash)",
            ActivityType::Jnls => "Journal entry (stock)",
            ActivityType::Ma => "Merger/Acquisition",
            ActivityType::Nc => "Name change",
            ActivityType::Opasn => "Option assignment",
            ActivityType::Opexc => "Option exercise",
            ActivityType::Opexp => "Option expiration",
            ActivityType::Optrd => "Option trade",
            ActivityType::Ptc => "Pass Thru Charge",
            ActivityType::Ptr => "Pass Thru Rebate",
            ActivityType::Reorg => "Reorg CA",
            ActivityType::Sc => "Symbol change",
            ActivityType::Sso => "Stock spinoff",
            ActivityType::Ssp => "Stock split",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    TradeActivity,
    NonTradeActivity,
}

wire_enum!(ActivityCategory {
    TradeActivity => "trade_activity",
    NonTradeActivity => "non_trade_activity",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillType {
    Fill,
    PartialFill,
}

wire_enum!(FillType {
    Fill => "fill",
    PartialFill => "partial_fill",
});

/// One account activity. Trade activities (fills) and non-trade activities
/// (cash movements, dividends, fees) share this shape; fields the other
/// kind carries are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActivity {
    pub id: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub qty: Option<NumericString<f64>>,

    // Trade activities
    #[serde(default)]
    pub transaction_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub fill_type: Option<FillType>,
    #[serde(default)]
    pub side: Option<OrderSide>,
    #[serde(default)]
    pub price: Option<NumericString<f64>>,
    #[serde(default)]
    pub cum_qty: Option<NumericString<f64>>,
    #[serde(default)]
    pub leaves_qty: Option<NumericString<f64>>,
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub order_status: Option<String>,

    // Non-trade activities
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub net_amount: Option<NumericString<f64>>,
    #[serde(default)]
    pub per_share_amount: Option<NumericString<f64>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AccountActivity {
    pub fn is_trade(&self) -> bool {
        self.transaction_time.is_some() || self.fill_type.is_some()
    }

    /// Signed cash effect of a fill (negative for buys), or the net amount
    /// of a non-trade activity.
    pub fn amount(&self) -> Option<f64> {
        if let Some(net) = self.net_amount {
            return Some(net.value());
        }
        let price = self.price?.value();
        let qty = self.qty?.value();
        let side = self.side?;
        Some(-side.sign() * price * qty)
    }
}

// ===== Calendar =====

/// One trading day. Session times are exchange-local "HH:MM".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub settlement_date: Option<NaiveDate>,
}

impl CalendarDay {
    pub fn session_open(&self) -> Option<NaiveDateTime> {
        session_time(self.date, &self.open)
    }

    pub fn session_close(&self) -> Option<NaiveDateTime> {
        session_time(self.date, &self.close)
    }

    /// Early closes end before the regular 16:00.
    pub fn is_early_close(&self) -> bool {
        match (self.session_close(), NaiveTime::from_hms_opt(16, 0, 0)) {
            (Some(close), Some(regular)) => close.time() < regular,
            _ => false,
        }
    }
}

fn session_time(date: NaiveDate, time: &str) -> Option<NaiveDateTime> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .ok()
        .map(|time| date.and_time(time))
}

// ===== Portfolio history =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntradayReporting {
    Continuous,
    MarketHours,
    ExtendedHours,
}

wire_enum!(IntradayReporting {
    Continuous => "continuous",
    MarketHours => "market_hours",
    ExtendedHours => "extended_hours",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlReset {
    NoReset,
    PerDay,
}

wire_enum!(PnlReset {
    NoReset => "no_reset",
    PerDay => "per_day",
});

/// Equity and P&L series; the arrays are parallel to `timestamp`
/// (Unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioHistory {
    pub timestamp: Vec<i64>,
    pub equity: Vec<f64>,
    pub profit_loss: Vec<f64>,
    #[serde(default)]
    pub profit_loss_pct: Option<Vec<f64>>,
    pub base_value: f64,
    #[serde(default)]
    pub base_value_asof: Option<NaiveDate>,
    pub timeframe: Timeframe,
}

impl PortfolioHistory {
    /// (time, equity) pairs; entries with an out-of-range timestamp are skipped.
    pub fn equity_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.timestamp
            .iter()
            .zip(&self.equity)
            .filter_map(|(&ts, &equity)| DateTime::from_timestamp(ts, 0).map(|at| (at, equity)))
            .collect()
    }

    pub fn last_equity(&self) -> Option<f64> {
        self.equity.last().copied()
    }
}

// ===== Configurations =====

/// Which side of a day trade the buying-power or PDT check runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTradeCheck {
    Both,
    Entry,
    Exit,
}

wire_enum!(DayTradeCheck {
    Both => "both",
    Entry => "entry",
    Exit => "exit",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeConfirmEmail {
    All,
    #[serde(rename = "none")]
    Off,
}

wire_enum!(TradeConfirmEmail {
    All => "all",
    Off => "none",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarginMultiplier {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "4")]
    Four,
}

wire_enum!(MarginMultiplier {
    One => "1",
    Two => "2",
    Four => "4",
});

impl MarginMultiplier {
    pub fn factor(&self) -> u8 {
        match self {
            MarginMultiplier::One => 1,
            MarginMultiplier::Two => 2,
            MarginMultiplier::Four => 4,
        }
    }
}

/// Highest options level the account may trade at. Sent as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionsTradingLevel {
    Disabled,
    Level1,
    Level2,
}

impl OptionsTradingLevel {
    pub fn description(&self) -> &'static str {
        match self {
            OptionsTradingLevel::Disabled => "Disabled",
            OptionsTradingLevel::Level1 => "Covered Call/Cash-Secured Put",
            OptionsTradingLevel::Level2 => "Covered Call/Cash-Secured Put and Long Call/Put",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            OptionsTradingLevel::Disabled => "Disabled",
            OptionsTradingLevel::Level1 => "Level 1",
            OptionsTradingLevel::Level2 => "Level 2",
        }
    }
}

impl TryFrom<u8> for OptionsTradingLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(OptionsTradingLevel::Disabled),
            1 => Ok(OptionsTradingLevel::Level1),
            2 => Ok(OptionsTradingLevel::Level2),
            other => Err(format!("unknown options trading level {}", other)),
        }
    }
}

impl From<OptionsTradingLevel> for u8 {
    fn from(level: OptionsTradingLevel) -> Self {
        match level {
            OptionsTradingLevel::Disabled => 0,
            OptionsTradingLevel::Level1 => 1,
            OptionsTradingLevel::Level2 => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfigurations {
    pub dtbp_check: DayTradeCheck,
    #[serde(default)]
    pub no_shorting: bool,
    #[serde(default)]
    pub suspend_trade: bool,
    pub trade_confirm_email: TradeConfirmEmail,
    #[serde(default)]
    pub fractional_trading: bool,
    pub max_margin_multiplier: MarginMultiplier,
    #[serde(default)]
    pub max_options_trading_level: Option<OptionsTradingLevel>,
    pub pdt_check: DayTradeCheck,
    #[serde(default)]
    pub ptp_no_exception_entry: bool,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountConfigurationsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtbp_check: Option<DayTradeCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_shorting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend_trade: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_confirm_email: Option<TradeConfirmEmail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fractional_trading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_margin_multiplier: Option<MarginMultiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_options_trading_level: Option<OptionsTradingLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdt_check: Option<DayTradeCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptp_no_exception_entry: Option<bool>,
}

impl From<AccountConfigurations> for AccountConfigurationsUpdate {
    fn from(config: AccountConfigurations) -> Self {
        Self {
            dtbp_check: Some(config.dtbp_check),
            no_shorting: Some(config.no_shorting),
            suspend_trade: Some(config.suspend_trade),
            trade_confirm_email: Some(config.trade_confirm_email),
            fractional_trading: Some(config.fractional_trading),
            max_margin_multiplier: Some(config.max_margin_multiplier),
            max_options_trading_level: config.max_options_trading_level,
            pdt_check: Some(config.pdt_check),
            ptp_no_exception_entry: Some(config.ptp_no_exception_entry),
        }
    }
}
