mod common;

use common::{ENTITLEMENT_ERROR, QUOTE_JSON, client_with};
use rustpaca::AlpacaError;
use rustpaca::domain::market::{DataFeed, EquityFeed, FeedFamily, OptionFeed, Timeframe};
use rustpaca::domain::ports::FeedStore;
use rustpaca::infrastructure::alpaca::{Credentials, HistoryQuery};
use rustpaca::infrastructure::{InMemoryFeedStore, MockTransport};
use std::sync::Arc;

fn setup(mock: &MockTransport) -> (rustpaca::AlpacaClient, Arc<InMemoryFeedStore>) {
    let store = Arc::new(InMemoryFeedStore::new());
    let client = client_with(Credentials::bearer("tok"), mock, store.clone());
    (client, store)
}

#[tokio::test]
async fn test_quote_falls_back_sip_iex_otc() -> anyhow::Result<()> {
    let mock = MockTransport::new()
        .reply(403, ENTITLEMENT_ERROR)
        .reply(200, ENTITLEMENT_ERROR)
        .reply(200, format!(r#"{{"symbol":"AAPL","quote":{}}}"#, QUOTE_JSON));
    let (client, store) = setup(&mock);

    let quote = client.data().quote("AAPL", None, None).await?;

    assert_eq!(quote.ask_price, 188.35);
    assert_eq!(
        mock.query_values("feed"),
        vec![
            Some("sip".to_string()),
            Some("iex".to_string()),
            Some("otc".to_string())
        ]
    );
    assert_eq!(store.load(FeedFamily::Equities).as_deref(), Some("otc"));

    for request in mock.requests() {
        assert_eq!(request.url.path(), "/v2/stocks/AAPL/quotes/latest");
    }
    Ok(())
}

#[tokio::test]
async fn test_remembered_tier_is_tried_first() -> anyhow::Result<()> {
    let mock = MockTransport::new().reply(200, format!(r#"{{"quote":{}}}"#, QUOTE_JSON));
    let (client, store) = setup(&mock);
    store.save(FeedFamily::Equities, "iex")?;

    client.data().quote("AAPL", None, None).await?;

    assert_eq!(mock.query_values("feed"), vec![Some("iex".to_string())]);
    Ok(())
}

#[tokio::test]
async fn test_explicit_tier_overrides_memory() -> anyhow::Result<()> {
    let mock = MockTransport::new().reply(200, format!(r#"{{"quote":{}}}"#, QUOTE_JSON));
    let (client, store) = setup(&mock);
    store.save(FeedFamily::Equities, "otc")?;

    client
        .data()
        .quote("AAPL", None, Some(EquityFeed::Sip))
        .await?;

    assert_eq!(mock.query_values("feed"), vec![Some("sip".to_string())]);
    assert_eq!(store.load(FeedFamily::Equities).as_deref(), Some("sip"));
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_also_advances() -> anyhow::Result<()> {
    let mock = MockTransport::new()
        .fail("connection reset")
        .reply(200, r#"{"bars":{"AAPL":[]},"next_page_token":null}"#);
    let (client, store) = setup(&mock);

    let bars = client
        .data()
        .bars(
            Timeframe::OneDay,
            &["AAPL"],
            &HistoryQuery::default(),
            None,
        )
        .await;

    assert!(bars.contains_key("AAPL"));
    assert_eq!(mock.request_count(), 2);
    assert_eq!(store.load(FeedFamily::Equities).as_deref(), Some("iex"));
    Ok(())
}

#[tokio::test]
async fn test_bulk_exhaustion_returns_empty() {
    let mock = MockTransport::new()
        .reply(403, ENTITLEMENT_ERROR)
        .reply(403, ENTITLEMENT_ERROR)
        .reply(403, ENTITLEMENT_ERROR);
    let (client, store) = setup(&mock);

    let bars = client.data().latest_bars(&["AAPL", "MSFT"], None).await;

    assert!(bars.is_empty());
    assert_eq!(mock.request_count(), 3);
    assert_eq!(store.load(FeedFamily::Equities), None);
}

#[tokio::test]
async fn test_single_exhaustion_returns_last_error() {
    let mock = MockTransport::new()
        .reply(403, r#"{"message":"sip denied"}"#)
        .reply(403, r#"{"message":"iex denied"}"#)
        .reply(403, r#"{"message":"otc denied","code":40310000}"#);
    let (client, _store) = setup(&mock);

    let err = client.data().snapshot("AAPL", None, None).await.unwrap_err();

    match err {
        AlpacaError::Server { message, code } => {
            assert_eq!(message, "otc denied");
            assert_eq!(code, Some(40310000));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.remaining(), 0);
}

#[tokio::test]
async fn test_option_chain_falls_back_to_indicative() {
    let quote = QUOTE_JSON.replace(r#""c":["R"]"#, r#""c":"A""#);
    let snapshot = format!(r#"{{"latestQuote":{}}}"#, quote);
    let mock = MockTransport::new().reply(403, ENTITLEMENT_ERROR).reply(
        200,
        format!(
            r#"{{"snapshots":{{"AAPL240621C00190000":{}}},"next_page_token":null}}"#,
            snapshot
        ),
    );
    let (client, store) = setup(&mock);

    let chain = client.data().option_chain("AAPL", None).await;

    assert_eq!(chain.len(), 1);
    assert!(chain["AAPL240621C00190000"].latest_trade.is_none());
    assert_eq!(
        mock.query_values("feed"),
        vec![Some("opra".to_string()), Some("indicative".to_string())]
    );
    assert_eq!(store.load(FeedFamily::Options).as_deref(), Some("indicative"));
    assert_eq!(store.load(FeedFamily::Equities), None);

    // Options data lives under the older API version.
    let request = mock.last_request().unwrap();
    assert_eq!(request.url.path(), "/v1beta1/options/snapshots/AAPL");
}

#[tokio::test]
async fn test_single_option_snapshot_absent_when_exhausted() {
    let mock = MockTransport::new()
        .reply(500, "upstream unavailable")
        .reply(500, "upstream unavailable");
    let (client, _store) = setup(&mock);

    let snapshot = client.data().option_snapshot("AAPL240621C00190000").await;

    assert!(snapshot.is_none());
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_option_quotes_start_from_memory() {
    let mock = MockTransport::new().reply(200, r#"{"quotes":{}}"#);
    let (client, store) = setup(&mock);
    tokio_test::assert_ok!(store.save(FeedFamily::Options, OptionFeed::Indicative.as_str()));

    let quotes = client
        .data()
        .option_latest_quotes(&["AAPL240621C00190000"], None)
        .await;

    assert!(quotes.is_empty());
    assert_eq!(mock.query_values("feed"), vec![Some("indicative".to_string())]);
}
