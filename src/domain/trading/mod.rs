// Orders, account entities and realized P&L attribution
pub mod account;
pub mod pnl;
pub mod types;

pub use account::{
    Account, AccountActivity, AccountConfigurations, AccountConfigurationsUpdate, ActivityCategory,
    ActivityType, Asset, CalendarDay, Clock, DayTradeCheck, FillType, IntradayReporting,
    MarginMultiplier, MultiResponse, OptionContract, OptionsTradingLevel, PnlReset,
    PortfolioHistory, TradeConfirmEmail,
};
pub use pnl::{Lot, LotLedger, realized_pnl};
pub use types::{
    AssetClass, Order, OrderClass, OrderQueryStatus, OrderSide, OrderStatus, OrderType,
    PositionIntent, TimeInForce,
};
