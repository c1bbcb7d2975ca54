mod common;

use common::{ORDER_ID, client, client_with, order_json};
use rust_decimal_macros::dec;
use rustpaca::AlpacaError;
use rustpaca::domain::ports::HttpMethod;
use rustpaca::domain::trading::{OrderSide, OrderStatus};
use rustpaca::infrastructure::alpaca::{ContractsQuery, Credentials, NewsQuery, OrderRequest};
use rustpaca::infrastructure::{InMemoryFeedStore, MockTransport};
use serde_json::Value;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

const ACCOUNT_JSON: &str = r#"{
    "id": "904837e3-3b76-47ec-b432-046db621571b",
    "account_number": "PA3ABCDEFG",
    "status": "ACTIVE",
    "currency": "USD",
    "cash": "100000.25",
    "buying_power": "400000",
    "equity": "100500.75",
    "last_equity": "100000.25",
    "daytrade_count": 0
}"#;

#[tokio::test]
async fn test_account_decodes_numeric_strings() -> anyhow::Result<()> {
    let mock = MockTransport::new().reply(200, ACCOUNT_JSON);
    let client = client(&mock);

    let account = client.account().await?;

    assert_eq!(account.cash.value(), dec!(100000.25));
    assert_eq!(account.day_change(), Some(dec!(500.50)));

    let request = mock.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url.as_str(), "https://paper-api.alpaca.markets/v2/account");
    assert_eq!(request.header("APCA-API-KEY-ID"), Some("PKTEST"));
    assert_eq!(request.header("APCA-API-SECRET-KEY"), Some("SKTEST"));
    assert_eq!(request.header("Authorization"), None);
    Ok(())
}

#[tokio::test]
async fn test_bearer_client_sends_only_authorization() -> anyhow::Result<()> {
    let mock = MockTransport::new().reply(200, ACCOUNT_JSON);
    let client = client_with(
        Credentials::bearer("oauth-token"),
        &mock,
        Arc::new(InMemoryFeedStore::new()),
    );

    client.account().await?;

    let request = mock.last_request().unwrap();
    assert_eq!(request.header("Authorization"), Some("Bearer oauth-token"));
    assert_eq!(request.header("APCA-API-KEY-ID"), None);
    assert_eq!(request.header("APCA-API-SECRET-KEY"), None);
    Ok(())
}

#[tokio::test]
async fn test_error_body_under_success_status() {
    let mock = MockTransport::new().reply(200, r#"{"code":40110000,"message":"request is not authorized"}"#);
    let client = client(&mock);

    let err = assert_err!(client.account().await);

    match err {
        AlpacaError::Server { message, code } => {
            assert_eq!(message, "request is not authorized");
            assert_eq!(code, Some(40110000));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_number_is_reported_with_its_value() {
    let body = ACCOUNT_JSON.replace(r#""cash": "100000.25""#, r#""cash": "abc""#);
    let mock = MockTransport::new().reply(200, body);
    let client = client(&mock);

    match client.account().await {
        Err(AlpacaError::MalformedNumber { value, target }) => {
            assert_eq!(value, "abc");
            assert_eq!(target, "Decimal");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_shape_is_unexpected_schema() {
    let mock = MockTransport::new().reply(200, r#"{"timestamp":"2024-03-14T14:30:00Z"}"#);
    let client = client(&mock);

    let err = assert_err!(client.clock().await);
    assert!(
        matches!(err, AlpacaError::UnexpectedSchema { ref path, .. } if path == "clock"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_news_uses_older_version_and_unwraps() -> anyhow::Result<()> {
    let body = r#"{
        "news": [{
            "id": 24843171,
            "headline": "Apple shares rise",
            "author": "Benzinga",
            "created_at": "2024-03-14T14:30:00Z",
            "updated_at": "2024-03-14T14:31:00Z",
            "summary": "",
            "url": "https://example.com/a",
            "images": [{"size": "thumb", "url": "https://example.com/t.jpg"}],
            "symbols": ["AAPL"],
            "source": "benzinga"
        }],
        "next_page_token": null
    }"#;
    let mock = MockTransport::new().reply(200, body);
    let client = client(&mock);

    let news = client
        .data()
        .news(&NewsQuery {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            limit: Some(5),
            ..Default::default()
        })
        .await?;

    assert_eq!(news.len(), 1);
    assert_eq!(news[0].thumb(), Some("https://example.com/t.jpg"));

    let request = mock.last_request().unwrap();
    assert_eq!(request.url.host_str(), Some("data.alpaca.markets"));
    assert_eq!(request.url.path(), "/v1beta1/news");
    assert_eq!(mock.query_values("symbols"), vec![Some("AAPL,MSFT".to_string())]);
    assert_eq!(mock.query_values("limit"), vec![Some("5".to_string())]);
    assert_eq!(mock.query_values("page_token"), vec![None]);
    Ok(())
}

#[tokio::test]
async fn test_create_order_sends_numeric_strings_without_nulls() -> anyhow::Result<()> {
    let mock = MockTransport::new().reply(200, order_json(ORDER_ID, "buy", "10", None, None));
    let client = client(&mock);

    let order = client
        .create_order(&OrderRequest::limit("AAPL", 10.0, OrderSide::Buy, 172.5))
        .await?;
    assert_eq!(order.status, OrderStatus::New);

    let request = mock.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url.path(), "/v2/orders");
    assert_eq!(request.header("Content-Type"), Some("application/json"));

    let body: Value = serde_json::from_slice(request.body.as_deref().unwrap_or_default())?;
    let body = body.as_object().unwrap();
    assert_eq!(body["qty"], "10");
    assert_eq!(body["limit_price"], "172.5");
    assert_eq!(body["side"], "buy");
    assert!(body.values().all(|value| !value.is_null()));
    assert!(!body.contains_key("stop_price"));
    Ok(())
}

#[tokio::test]
async fn test_cancel_order_accepts_empty_body() {
    let id = Uuid::parse_str(ORDER_ID).unwrap();
    let mock = MockTransport::new().reply(204, "");
    let client = client(&mock);

    assert_ok!(client.cancel_order(id).await);

    let request = mock.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.url.path(), format!("/v2/orders/{}", ORDER_ID));
}

#[tokio::test]
async fn test_cancel_order_failures() {
    let id = Uuid::parse_str(ORDER_ID).unwrap();
    let mock = MockTransport::new()
        .reply(200, r#"{"code":42210000,"message":"order is already in filled state"}"#)
        .reply(422, "Unprocessable Entity");
    let client = client(&mock);

    let err = assert_err!(client.cancel_order(id).await);
    assert!(err.is_server_error());

    match client.cancel_order(id).await {
        Err(AlpacaError::Status { status, body, .. }) => {
            assert_eq!(status, 422);
            assert_eq!(body, "Unprocessable Entity");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_all_reports_each_order() -> anyhow::Result<()> {
    let body = format!(
        r#"[{{"id":"{id}","status":200,"body":{order}}},{{"id":"{other}","status":500,"body":null}}]"#,
        id = ORDER_ID,
        order = order_json(ORDER_ID, "sell", "5", None, None),
        other = Uuid::new_v4(),
    );
    let mock = MockTransport::new().reply(207, body);
    let client = client(&mock);

    let responses = client.cancel_orders().await?;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].status, 200);
    assert_eq!(responses[0].body.as_ref().map(|o| o.symbol.as_str()), Some("AAPL"));
    assert_eq!(responses[1].status, 500);
    assert!(responses[1].body.is_none());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    let mock = MockTransport::new().fail("connection refused").reply(200, ACCOUNT_JSON);
    let client = client(&mock);

    let err = assert_err!(client.account().await);

    assert!(err.is_transport());
    assert_eq!(mock.request_count(), 1);
    assert_eq!(mock.remaining(), 1);
}

#[tokio::test]
async fn test_option_contracts_unwrap_and_stay_on_trading_host() -> anyhow::Result<()> {
    let body = r#"{
        "option_contracts": [{
            "id": "6e58f870-fe73-4583-81e4-b9a37892c36f",
            "symbol": "AAPL240621C00190000",
            "name": "AAPL Jun 21 2024 190 Call",
            "status": "active",
            "tradable": true,
            "expiration_date": "2024-06-21",
            "root_symbol": "AAPL",
            "underlying_symbol": "AAPL",
            "type": "call",
            "style": "american",
            "strike_price": "190",
            "size": "100",
            "open_interest": null,
            "close_price": "4.35"
        }],
        "next_page_token": null
    }"#;
    let mock = MockTransport::new().reply(200, body);
    let client = client(&mock);

    let contracts = client
        .option_contracts(&ContractsQuery {
            underlying_symbols: vec!["AAPL".to_string()],
            ..Default::default()
        })
        .await?;

    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].strike_price.value(), 190.0);
    assert!(contracts[0].open_interest.is_none());

    let request = mock.last_request().unwrap();
    assert_eq!(request.url.path(), "/v2/options/contracts");
    assert_eq!(mock.query_values("underlying_symbols"), vec![Some("AAPL".to_string())]);
    Ok(())
}
