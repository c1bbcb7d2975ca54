use super::environment::{
    AccountMode, Credentials, DATA_API_URL, Environment, LIVE_API_URL, PAPER_API_URL,
};
use super::market_data::AlpacaDataClient;
use super::rest::RestClient;
use crate::domain::errors::{AlpacaError, Result};
use crate::domain::numeric;
use crate::domain::ports::{FeedStore, HttpMethod, HttpTransport};
use crate::domain::trading::{
    Account, AccountActivity, AccountConfigurations, AccountConfigurationsUpdate,
    ActivityCategory, ActivityType, Asset, AssetClass, CalendarDay, Clock, IntradayReporting,
    MultiResponse, OptionContract, Order, OrderClass, OrderQueryStatus, OrderSide, OrderType,
    PnlReset, PortfolioHistory, PositionIntent, TimeInForce,
};
use crate::domain::market::{SortDirection, Timeframe};
use crate::infrastructure::core::http_client_factory::ReqwestTransport;
use crate::infrastructure::feed_store::InMemoryFeedStore;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn iso8601(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn day(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

// ===== Requests =====

/// Filters for the order listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct OrdersQuery {
    pub status: Option<OrderQueryStatus>,
    pub limit: Option<u32>,
    pub after: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub direction: Option<SortDirection>,
    pub nested: Option<bool>,
    pub symbols: Vec<String>,
    pub side: Option<OrderSide>,
}

impl OrdersQuery {
    fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("status", self.status.map(|s| s.as_str().to_string())),
            ("limit", self.limit.map(|l| l.to_string())),
            ("after", iso8601(self.after)),
            ("until", iso8601(self.until)),
            ("direction", self.direction.map(|d| d.as_str().to_string())),
            ("nested", self.nested.map(|n| n.to_string())),
            (
                "symbols",
                (!self.symbols.is_empty()).then(|| self.symbols.join(",")),
            ),
            ("side", self.side.map(|s| s.as_str().to_string())),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractsQuery {
    pub underlying_symbols: Vec<String>,
    pub status: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub expiration_date_gte: Option<NaiveDate>,
    pub expiration_date_lte: Option<NaiveDate>,
    pub root_symbol: Option<String>,
    pub contract_type: Option<String>,
    pub style: Option<String>,
    pub strike_price_gte: Option<f64>,
    pub strike_price_lte: Option<f64>,
    pub limit: Option<u32>,
    pub page_token: Option<String>,
}

impl ContractsQuery {
    fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            (
                "underlying_symbols",
                (!self.underlying_symbols.is_empty()).then(|| self.underlying_symbols.join(",")),
            ),
            ("status", self.status.clone()),
            ("expiration_date", day(self.expiration_date)),
            ("expiration_date_gte", day(self.expiration_date_gte)),
            ("expiration_date_lte", day(self.expiration_date_lte)),
            ("root_symbol", self.root_symbol.clone()),
            ("type", self.contract_type.clone()),
            ("style", self.style.clone()),
            ("strike_price_gte", self.strike_price_gte.map(numeric::encode)),
            ("strike_price_lte", self.strike_price_lte.map(numeric::encode)),
            ("limit", self.limit.map(|l| l.to_string())),
            ("page_token", self.page_token.clone()),
        ]
    }
}

/// Paging and time filters for account activities.
#[derive(Debug, Clone, Default)]
pub struct ActivitiesQuery {
    pub date: Option<NaiveDate>,
    pub until: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub direction: Option<SortDirection>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub category: Option<ActivityCategory>,
}

impl ActivitiesQuery {
    fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("date", day(self.date)),
            ("until", iso8601(self.until)),
            ("after", iso8601(self.after)),
            ("direction", self.direction.map(|d| d.as_str().to_string())),
            ("page_size", self.page_size.map(|p| p.to_string())),
            ("page_token", self.page_token.clone()),
            ("category", self.category.map(|c| c.as_str().to_string())),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioHistoryQuery {
    /// e.g. "1D", "1W", "3M", "1A".
    pub period: Option<String>,
    pub timeframe: Option<Timeframe>,
    pub intraday_reporting: Option<IntradayReporting>,
    pub pnl_reset: Option<PnlReset>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub date_end: Option<NaiveDate>,
    pub extended_hours: Option<bool>,
}

impl PortfolioHistoryQuery {
    fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("period", self.period.clone()),
            ("timeframe", self.timeframe.map(|t| t.as_str().to_string())),
            (
                "intraday_reporting",
                self.intraday_reporting.map(|r| r.as_str().to_string()),
            ),
            ("pnl_reset", self.pnl_reset.map(|r| r.as_str().to_string())),
            ("start", iso8601(self.start)),
            ("end", iso8601(self.end)),
            ("date_end", day(self.date_end)),
            ("extended_hours", self.extended_hours.map(|e| e.to_string())),
        ]
    }
}

/// A new order. Quantities and prices are sent as numeric strings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: f64,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub trail_price: Option<f64>,
    pub trail_percent: Option<f64>,
    pub extended_hours: bool,
    pub order_class: Option<OrderClass>,
    pub take_profit_limit_price: Option<f64>,
    pub stop_loss_stop_price: Option<f64>,
    pub stop_loss_limit_price: Option<f64>,
    pub position_intent: Option<PositionIntent>,
}

impl OrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        qty: f64,
        side: OrderSide,
        order_type: OrderType,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side,
            order_type,
            time_in_force,
            limit_price: None,
            stop_price: None,
            trail_price: None,
            trail_percent: None,
            extended_hours: false,
            order_class: None,
            take_profit_limit_price: None,
            stop_loss_stop_price: None,
            stop_loss_limit_price: None,
            position_intent: None,
        }
    }

    pub fn market(symbol: impl Into<String>, qty: f64, side: OrderSide) -> Self {
        Self::new(symbol, qty, side, OrderType::Market, TimeInForce::Day)
    }

    pub fn limit(symbol: impl Into<String>, qty: f64, side: OrderSide, limit_price: f64) -> Self {
        Self {
            limit_price: Some(limit_price),
            ..Self::new(symbol, qty, side, OrderType::Limit, TimeInForce::Day)
        }
    }

    /// Attach take-profit and stop-loss legs.
    pub fn bracket(mut self, take_profit: f64, stop_loss: f64, stop_limit: Option<f64>) -> Self {
        self.order_class = Some(OrderClass::Bracket);
        self.take_profit_limit_price = Some(take_profit);
        self.stop_loss_stop_price = Some(stop_loss);
        self.stop_loss_limit_price = stop_limit;
        self
    }

    pub fn with_position_intent(mut self, intent: PositionIntent) -> Self {
        self.position_intent = Some(intent);
        self
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_extended_hours(mut self, extended_hours: bool) -> Self {
        self.extended_hours = extended_hours;
        self
    }

    /// JSON body; absent options are null here and dropped before sending.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut stop_loss = Map::new();
        if let Some(stop) = self.stop_loss_stop_price {
            stop_loss.insert("stop_price".to_string(), json!(numeric::encode(stop)));
        }
        if let Some(limit) = self.stop_loss_limit_price {
            stop_loss.insert("limit_price".to_string(), json!(numeric::encode(limit)));
        }

        let body = json!({
            "symbol": self.symbol,
            "qty": numeric::encode(self.qty),
            "side": self.side.as_str(),
            "type": self.order_type.as_str(),
            "time_in_force": self.time_in_force.as_str(),
            "extended_hours": self.extended_hours,
            "limit_price": self.limit_price.map(numeric::encode),
            "stop_price": self.stop_price.map(numeric::encode),
            "trail_price": self.trail_price.map(numeric::encode),
            "trail_percent": self.trail_percent.map(numeric::encode),
            "order_class": self.order_class.map(|c| c.as_str()),
            "take_profit": self
                .take_profit_limit_price
                .map(|price| json!({ "limit_price": numeric::encode(price) })),
            "stop_loss": (!stop_loss.is_empty()).then_some(Value::Object(stop_loss)),
            "position_intent": self.position_intent.map(|i| i.as_str()),
        });

        match body {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

// ===== Client =====

/// Trading client. Holds live and paper environments built from one
/// credential set plus a market-data client on the data host.
pub struct AlpacaClient {
    rest: RestClient,
    live: Environment,
    paper: Environment,
    data: AlpacaDataClient,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl AlpacaClient {
    pub fn builder(credentials: Credentials) -> AlpacaClientBuilder {
        AlpacaClientBuilder::new(credentials)
    }

    pub fn environment(&self) -> &Environment {
        self.rest.environment()
    }

    pub fn mode(&self) -> AccountMode {
        self.environment().mode()
    }

    pub fn data(&self) -> &AlpacaDataClient {
        &self.data
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Only bearer-token sessions may move between live and paper.
    pub fn can_switch(&self) -> bool {
        self.environment().credentials.is_bearer()
    }

    pub fn switch_mode(&mut self, mode: AccountMode) -> Result<()> {
        if !self.can_switch() {
            return Err(AlpacaError::ModeSwitchUnsupported);
        }

        let environment = match mode {
            AccountMode::Live => self.live.clone(),
            AccountMode::Paper => self.paper.clone(),
        };
        self.rest = RestClient::new(self.transport.clone(), environment, self.timeout);
        info!("AlpacaClient: switched to {} mode", mode);
        Ok(())
    }

    // ===== Account =====

    pub async fn account(&self) -> Result<Account> {
        self.rest.get("account", &[]).await
    }

    pub async fn clock(&self) -> Result<Clock> {
        self.rest.get("clock", &[]).await
    }

    /// Trading days between `start` and `end`, inclusive.
    pub async fn calendar(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CalendarDay>> {
        let params = [("start", day(start)), ("end", day(end))];
        self.rest.get("calendar", &params).await
    }

    /// Activities of the given types; all types when `types` is empty.
    pub async fn account_activities(
        &self,
        types: &[ActivityType],
        query: &ActivitiesQuery,
    ) -> Result<Vec<AccountActivity>> {
        let mut params = query.params();
        params.push((
            "activity_types",
            (!types.is_empty()).then(|| {
                types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
        ));
        self.rest.get("account/activities", &params).await
    }

    pub async fn account_activities_of(
        &self,
        activity_type: ActivityType,
        query: &ActivitiesQuery,
    ) -> Result<Vec<AccountActivity>> {
        self.rest
            .get(
                &format!("account/activities/{}", activity_type),
                &query.params(),
            )
            .await
    }

    pub async fn portfolio_history(
        &self,
        query: &PortfolioHistoryQuery,
    ) -> Result<PortfolioHistory> {
        self.rest
            .get("account/portfolio/history", &query.params())
            .await
    }

    pub async fn account_configurations(&self) -> Result<AccountConfigurations> {
        self.rest.get("account/configurations", &[]).await
    }

    /// Returns the configuration as stored after the update.
    pub async fn update_account_configurations(
        &self,
        update: &AccountConfigurationsUpdate,
    ) -> Result<AccountConfigurations> {
        let config: AccountConfigurations = self
            .rest
            .patch("account/configurations", &[], update)
            .await?;
        info!(
            "AlpacaClient: account configurations updated (no_shorting: {}, margin: {}x)",
            config.no_shorting,
            config.max_margin_multiplier.factor()
        );
        Ok(config)
    }

    // ===== Assets =====

    pub async fn assets(
        &self,
        status: Option<&str>,
        asset_class: Option<AssetClass>,
        exchange: Option<&str>,
    ) -> Result<Vec<Asset>> {
        let params = [
            ("status", status.map(str::to_string)),
            ("asset_class", asset_class.map(|c| c.as_str().to_string())),
            ("exchange", exchange.map(str::to_string)),
        ];
        self.rest.get("assets", &params).await
    }

    /// Look up an asset by symbol or asset id.
    pub async fn asset(&self, symbol_or_id: &str) -> Result<Asset> {
        self.rest.get(&format!("assets/{}", symbol_or_id), &[]).await
    }

    pub async fn option_contracts(&self, query: &ContractsQuery) -> Result<Vec<OptionContract>> {
        self.rest.get("options/contracts", &query.params()).await
    }

    pub async fn option_contract(&self, symbol_or_id: &str) -> Result<OptionContract> {
        self.rest
            .get(&format!("options/contracts/{}", symbol_or_id), &[])
            .await
    }

    // ===== Orders =====

    pub async fn orders(&self, query: &OrdersQuery) -> Result<Vec<Order>> {
        self.rest.get("orders", &query.params()).await
    }

    pub async fn order(&self, id: Uuid, nested: Option<bool>) -> Result<Order> {
        let params = [("nested", nested.map(|n| n.to_string()))];
        self.rest.get(&format!("orders/{}", id), &params).await
    }

    pub async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let order: Order = self
            .rest
            .send_params(HttpMethod::Post, "orders", request.to_params())
            .await?;

        info!(
            "AlpacaClient: order {} placed ({} {} {}, status: {})",
            order.id,
            order.side,
            numeric::encode(request.qty),
            order.symbol,
            order.status
        );
        Ok(order)
    }

    /// Cancel every open order; one entry per order with its own status.
    pub async fn cancel_orders(&self) -> Result<Vec<MultiResponse<Order>>> {
        let responses: Vec<MultiResponse<Order>> = self.rest.delete("orders", &[]).await?;
        info!("AlpacaClient: cancel requested for {} orders", responses.len());
        Ok(responses)
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<()> {
        self.rest
            .request_empty(HttpMethod::Delete, &format!("orders/{}", id), &[])
            .await?;
        info!("AlpacaClient: order {} cancelled", id);
        Ok(())
    }

    /// Closed orders for `symbol`, oldest fills first, for P&L replay.
    pub async fn order_history(&self, symbol: &str, limit: u32) -> Result<Vec<Order>> {
        let query = OrdersQuery {
            status: Some(OrderQueryStatus::Closed),
            limit: Some(limit),
            direction: Some(SortDirection::Asc),
            nested: Some(true),
            symbols: vec![symbol.to_string()],
            ..Default::default()
        };
        self.orders(&query).await
    }
}

pub struct AlpacaClientBuilder {
    credentials: Credentials,
    mode: AccountMode,
    live_url: String,
    paper_url: String,
    data_url: String,
    timeout: Duration,
    data_timeout: Duration,
    transport: Option<Arc<dyn HttpTransport>>,
    feed_store: Option<Arc<dyn FeedStore>>,
}

impl AlpacaClientBuilder {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            mode: AccountMode::Paper,
            live_url: LIVE_API_URL.to_string(),
            paper_url: PAPER_API_URL.to_string(),
            data_url: DATA_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            data_timeout: DEFAULT_TIMEOUT,
            transport: None,
            feed_store: None,
        }
    }

    pub fn mode(mut self, mode: AccountMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn live_url(mut self, url: impl Into<String>) -> Self {
        self.live_url = url.into();
        self
    }

    pub fn paper_url(mut self, url: impl Into<String>) -> Self {
        self.paper_url = url.into();
        self
    }

    pub fn data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn feed_store(mut self, store: Arc<dyn FeedStore>) -> Self {
        self.feed_store = Some(store);
        self
    }

    pub fn build(self) -> AlpacaClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        let feed_store = self
            .feed_store
            .unwrap_or_else(|| Arc::new(InMemoryFeedStore::new()));

        let live = Environment::new(self.live_url, self.credentials.clone());
        let paper = Environment::new(self.paper_url, self.credentials.clone());
        let data_env = Environment::data_at(self.data_url, self.credentials);

        let current = match self.mode {
            AccountMode::Live => live.clone(),
            AccountMode::Paper => paper.clone(),
        };

        let data = AlpacaDataClient::new(
            RestClient::new(transport.clone(), data_env, self.data_timeout),
            feed_store,
        );

        info!(
            "AlpacaClient: {} mode, trading at {}, data at {}",
            self.mode,
            current.api,
            data.rest().environment().api
        );

        AlpacaClient {
            rest: RestClient::new(transport.clone(), current, self.timeout),
            live,
            paper,
            data,
            transport,
            timeout: self.timeout,
        }
    }
}
