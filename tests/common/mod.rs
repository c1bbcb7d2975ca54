#![allow(dead_code)]

use rustpaca::domain::ports::FeedStore;
use rustpaca::infrastructure::alpaca::{AccountMode, AlpacaClient, Credentials};
use rustpaca::infrastructure::{InMemoryFeedStore, MockTransport};
use std::sync::Arc;

pub const ORDER_ID: &str = "61e69015-8549-4bfd-b9c3-01e75843f47d";

pub const QUOTE_JSON: &str = r#"{"t":"2024-02-07T20:59:59.9Z","bx":"V","bp":188.3,"bs":2,"ax":"V","ap":188.35,"as":1,"c":["R"],"z":"C"}"#;

pub const ENTITLEMENT_ERROR: &str =
    r#"{"code":40310000,"message":"subscription does not permit querying recent SIP data"}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn client_with(
    credentials: Credentials,
    mock: &MockTransport,
    store: Arc<InMemoryFeedStore>,
) -> AlpacaClient {
    init_tracing();
    AlpacaClient::builder(credentials)
        .mode(AccountMode::Paper)
        .transport(Arc::new(mock.clone()))
        .feed_store(store as Arc<dyn FeedStore>)
        .build()
}

pub fn client(mock: &MockTransport) -> AlpacaClient {
    client_with(
        Credentials::key_secret("PKTEST", "SKTEST"),
        mock,
        Arc::new(InMemoryFeedStore::new()),
    )
}

/// Minimal order payload as the trading API returns it.
pub fn order_json(id: &str, side: &str, qty: &str, price: Option<&str>, filled_at: Option<&str>) -> String {
    serde_json::json!({
        "id": id,
        "client_order_id": "",
        "created_at": "2024-03-14T14:00:00Z",
        "filled_at": filled_at,
        "symbol": "AAPL",
        "asset_class": "us_equity",
        "qty": qty,
        "filled_qty": if price.is_some() { qty } else { "0" },
        "filled_avg_price": price,
        "order_class": "",
        "type": "market",
        "side": side,
        "time_in_force": "day",
        "status": if price.is_some() { "filled" } else { "new" },
        "legs": null
    })
    .to_string()
}
