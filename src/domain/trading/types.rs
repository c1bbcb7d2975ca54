use crate::domain::numeric::NumericString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// `snake_case` wire name to "Title Case" display name.
fn title_case(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display name back to wire name.
fn wire_name(display: &str) -> String {
    display.trim().to_lowercase().replace(' ', "_")
}

macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn from_wire(raw: &str) -> Option<Self> {
                match raw {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use wire_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

wire_enum!(OrderSide { Buy => "buy", Sell => "sell" });

impl OrderSide {
    pub fn display(&self) -> String {
        title_case(self.as_str())
    }

    pub fn from_display(display: &str) -> Option<Self> {
        Self::from_wire(&wire_name(display))
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderClass {
    Simple,
    Bracket,
    Oco,
    Oto,
}

wire_enum!(OrderClass {
    Simple => "simple",
    Bracket => "bracket",
    Oco => "oco",
    Oto => "oto",
});

impl OrderClass {
    pub fn is_multi_leg(&self) -> bool {
        !matches!(self, OrderClass::Simple)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionIntent {
    BuyToOpen,
    BuyToClose,
    SellToOpen,
    SellToClose,
}

wire_enum!(PositionIntent {
    BuyToOpen => "buy_to_open",
    BuyToClose => "buy_to_close",
    SellToOpen => "sell_to_open",
    SellToClose => "sell_to_close",
});

impl PositionIntent {
    pub fn display(&self) -> String {
        title_case(self.as_str())
    }

    pub fn from_display(display: &str) -> Option<Self> {
        Self::from_wire(&wire_name(display))
    }

    pub fn side(&self) -> OrderSide {
        match self {
            PositionIntent::BuyToOpen | PositionIntent::BuyToClose => OrderSide::Buy,
            PositionIntent::SellToOpen | PositionIntent::SellToClose => OrderSide::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    Accepted,
    PendingNew,
    AcceptedForBidding,
    Stopped,
    Rejected,
    Suspended,
    Calculated,
    Held,
}

wire_enum!(OrderStatus {
    New => "new",
    PartiallyFilled => "partially_filled",
    Filled => "filled",
    DoneForDay => "done_for_day",
    Canceled => "canceled",
    Expired => "expired",
    Replaced => "replaced",
    PendingCancel => "pending_cancel",
    PendingReplace => "pending_replace",
    Accepted => "accepted",
    PendingNew => "pending_new",
    AcceptedForBidding => "accepted_for_bidding",
    Stopped => "stopped",
    Rejected => "rejected",
    Suspended => "suspended",
    Calculated => "calculated",
    Held => "held",
});

impl OrderStatus {
    pub fn display(&self) -> String {
        title_case(self.as_str())
    }

    pub fn from_display(display: &str) -> Option<Self> {
        Self::from_wire(&wire_name(display))
    }

    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            OrderStatus::New
                | OrderStatus::Accepted
                | OrderStatus::PendingNew
                | OrderStatus::PartiallyFilled
                | OrderStatus::AcceptedForBidding
                | OrderStatus::Calculated
                | OrderStatus::Held
        )
    }
}

/// `status` filter values for the order listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQueryStatus {
    Open,
    Closed,
    All,
}

impl OrderQueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderQueryStatus::Open => "open",
            OrderQueryStatus::Closed => "closed",
            OrderQueryStatus::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

wire_enum!(OrderType {
    Market => "market",
    Limit => "limit",
    Stop => "stop",
    StopLimit => "stop_limit",
    TrailingStop => "trailing_stop",
});

impl OrderType {
    pub fn display(&self) -> String {
        title_case(self.as_str())
    }

    pub fn from_display(display: &str) -> Option<Self> {
        Self::from_wire(&wire_name(display))
    }

    /// Types offered when placing an order by hand (no trailing stops).
    pub fn option_display() -> Vec<String> {
        Self::ALL
            .iter()
            .filter(|kind| **kind != OrderType::TrailingStop)
            .map(|kind| kind.display())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    Day,
    Gtc,
    Opg,
    Cls,
    Ioc,
    Fok,
}

wire_enum!(TimeInForce {
    Day => "day",
    Gtc => "gtc",
    Opg => "opg",
    Cls => "cls",
    Ioc => "ioc",
    Fok => "fok",
});

impl TimeInForce {
    pub fn display(&self) -> &'static str {
        match self {
            TimeInForce::Day => "Day",
            TimeInForce::Gtc => "Good Until Canceled",
            TimeInForce::Opg => "Market/Limit On Open",
            TimeInForce::Cls => "Market/Limit On Close",
            TimeInForce::Ioc => "Immediate Or Cancel",
            TimeInForce::Fok => "Fill Or Kill",
        }
    }

    pub fn from_display(display: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tif| tif.display() == display)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
}

wire_enum!(AssetClass {
    UsEquity => "us_equity",
    UsOption => "us_option",
    Crypto => "crypto",
});

/// The server sends `"order_class": ""` for plain orders.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<OrderClass>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => OrderClass::from_wire(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::unknown_variant(value, &["simple", "bracket", "oco", "oto"])),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    #[serde(default)]
    pub client_order_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_by: Option<Uuid>,
    #[serde(default)]
    pub replaces: Option<Uuid>,
    #[serde(default)]
    pub asset_id: Option<Uuid>,
    pub symbol: String,
    #[serde(default)]
    pub asset_class: Option<AssetClass>,
    #[serde(default)]
    pub qty: Option<NumericString<f64>>,
    pub filled_qty: NumericString<f64>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub limit_price: Option<NumericString<f64>>,
    #[serde(default)]
    pub stop_price: Option<NumericString<f64>>,
    #[serde(default)]
    pub filled_avg_price: Option<NumericString<f64>>,
    pub status: OrderStatus,
    #[serde(default)]
    pub extended_hours: bool,
    #[serde(default)]
    pub legs: Option<Vec<Order>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order_class: Option<OrderClass>,
    #[serde(default)]
    pub trail_price: Option<NumericString<f64>>,
    #[serde(default)]
    pub trail_percent: Option<NumericString<f64>>,
    #[serde(default)]
    pub notional: Option<NumericString<f64>>,
    #[serde(default)]
    pub position_intent: Option<PositionIntent>,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

impl std::hash::Hash for Order {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Order {
    pub fn filled_qty(&self) -> f64 {
        self.filled_qty.value()
    }

    pub fn filled_avg_price(&self) -> Option<f64> {
        self.filled_avg_price.map(|price| price.value())
    }

    pub fn is_filled(&self) -> bool {
        self.filled_avg_price.is_some()
    }

    pub fn is_cancelable(&self) -> bool {
        self.status.is_cancelable()
    }

    /// Fill quantity signed by side: positive for buys.
    pub fn signed_filled_qty(&self) -> f64 {
        self.side.sign() * self.filled_qty()
    }
}
