//! One request/response cycle against an Alpaca endpoint:
//! URL and version construction, authentication, the HTTP exchange, error
//! classification, envelope resolution and typed decoding.

use super::environment::{Environment, LEGACY_DATA_VERSION};
use super::{envelope, error_classifier};
use crate::domain::errors::{AlpacaError, Result};
use crate::domain::numeric;
use crate::domain::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::infrastructure::core::http_client_factory::build_url_with_query;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const USER_AGENT: &str = concat!("rustpaca/", env!("CARGO_PKG_VERSION"));

/// Query parameters; `None` values are left out of the URL.
pub type Query<'a> = [(&'a str, Option<String>)];

#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    environment: Environment,
    timeout: Duration,
}

impl RestClient {
    pub fn new(transport: Arc<dyn HttpTransport>, environment: Environment, timeout: Duration) -> Self {
        Self {
            transport,
            environment,
            timeout,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base endpoint joined with `path`. Options and news data are still
    /// served under the older API version, so their version segment is
    /// rewritten on the data host.
    pub fn url_for(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let full = format!("{}/{}", self.environment.api, path);

        if self.environment.is_data() && (path.contains("options/") || path.contains("news")) {
            full.replacen("/v2/", &format!("/{}/", LEGACY_DATA_VERSION), 1)
        } else {
            full
        }
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query<'_>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest> {
        let url = build_url_with_query(&self.url_for(path), query)?;

        let mut headers = self.environment.credentials.headers();
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        headers.push(("User-Agent".to_string(), USER_AGENT.to_string()));

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: self.timeout,
        })
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query<'_>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, path, query, body)?;
        debug!("RestClient: {} {}", request.method, request.url);

        let response = self.transport.execute(request).await?;
        debug!(
            "RestClient: {} {} -> HTTP {}",
            method,
            path,
            response.status
        );
        Ok(response)
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query<'_>,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let response = self.exchange(method, path, query, body).await?;
        decode_response(path, &response)
    }

    /// For endpoints that answer success with no payload. A non-empty body
    /// still goes through error classification.
    pub async fn request_empty(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query<'_>,
    ) -> Result<()> {
        let response = self.exchange(method, path, query, None).await?;

        if let Some(err) = error_classifier::classify_bytes(&response.body) {
            warn!("RestClient: {} {} failed: {}", method, path, err);
            return Err(err);
        }
        if !response.is_success() {
            return Err(status_error(path, &response));
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<T> {
        self.request(HttpMethod::Get, path, query, None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<T> {
        self.request(HttpMethod::Delete, path, query, None).await
    }

    pub async fn post<T, B>(&self, path: &str, query: &Query<'_>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Post, path, query, Some(encode_body(body)?))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, query: &Query<'_>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Put, path, query, Some(encode_body(body)?))
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, query: &Query<'_>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Patch, path, query, Some(encode_body(body)?))
            .await
    }

    /// Send a JSON object built from loose parameters; null members are dropped.
    pub async fn send_params<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        params: Map<String, Value>,
    ) -> Result<T> {
        let body = encode_body(&without_nulls(params))?;
        self.request(method, path, &[], Some(body)).await
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(AlpacaError::Encode)
}

pub fn without_nulls(params: Map<String, Value>) -> Map<String, Value> {
    params.into_iter().filter(|(_, value)| !value.is_null()).collect()
}

fn status_error(path: &str, response: &HttpResponse) -> AlpacaError {
    AlpacaError::Status {
        status: response.status,
        path: path.to_string(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    }
}

/// Turn a raw response into `T`.
///
/// The error shape is checked on the original body and again on the
/// resolved payload, before any status or schema check.
pub fn decode_response<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T> {
    let value: Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(parse_err) => {
            if !response.is_success() {
                return Err(status_error(path, response));
            }
            error!(
                "RestClient: {} returned a body that is not JSON: {}",
                path, parse_err
            );
            return Err(AlpacaError::UnexpectedSchema {
                path: path.to_string(),
                reason: format!("body is not JSON: {}", parse_err),
            });
        }
    };

    if let Some(err) = error_classifier::classify(&value) {
        warn!("RestClient: {} failed: {}", path, err);
        return Err(err);
    }

    let resolved = envelope::resolve(path, value);
    if let Some(err) = error_classifier::classify(&resolved) {
        warn!("RestClient: {} failed: {}", path, err);
        return Err(err);
    }

    if !response.is_success() {
        return Err(status_error(path, response));
    }

    numeric::reset_malformed();
    match serde_json::from_value::<T>(resolved) {
        Ok(decoded) => Ok(decoded),
        Err(decode_err) => {
            if let Some(malformed) = numeric::take_malformed() {
                warn!("RestClient: {} carried {}", path, malformed);
                return Err(malformed);
            }
            error!(
                "RestClient: {} does not match {}: {}",
                path,
                std::any::type_name::<T>(),
                decode_err
            );
            Err(AlpacaError::UnexpectedSchema {
                path: path.to_string(),
                reason: decode_err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::alpaca::environment::Credentials;
    use crate::infrastructure::mock::MockTransport;
    use serde_json::json;

    fn rest(environment: Environment) -> RestClient {
        RestClient::new(
            Arc::new(MockTransport::new()),
            environment,
            Duration::from_secs(5),
        )
    }

    fn client(api: &str, credentials: Credentials) -> RestClient {
        rest(Environment::new(api, credentials))
    }

    #[test]
    fn test_url_rewrites_version_for_options_and_news() {
        let data = rest(Environment::data(Credentials::bearer("t")));

        assert_eq!(
            data.url_for("options/snapshots/AAPL"),
            "https://data.alpaca.markets/v1beta1/options/snapshots/AAPL"
        );
        assert_eq!(data.url_for("news"), "https://data.alpaca.markets/v1beta1/news");
        assert_eq!(
            data.url_for("stocks/bars"),
            "https://data.alpaca.markets/v2/stocks/bars"
        );
    }

    #[test]
    fn test_url_rewritten_on_local_data_host() {
        let local = rest(Environment::data_at(
            "http://localhost:8080/v2",
            Credentials::bearer("t"),
        ));
        assert_eq!(local.url_for("news"), "http://localhost:8080/v1beta1/news");
        assert_eq!(
            local.url_for("stocks/AAPL/quotes/latest"),
            "http://localhost:8080/v2/stocks/AAPL/quotes/latest"
        );
    }

    #[test]
    fn test_url_not_rewritten_on_trading_host() {
        let trading = client("https://paper-api.alpaca.markets/v2", Credentials::bearer("t"));
        assert_eq!(
            trading.url_for("options/contracts"),
            "https://paper-api.alpaca.markets/v2/options/contracts"
        );
    }

    #[test]
    fn test_request_carries_exactly_one_auth_scheme() {
        let keyed = client(
            "https://api.alpaca.markets/v2",
            Credentials::key_secret("PK", "SK"),
        );
        let request = keyed
            .build_request(HttpMethod::Get, "account", &[], None)
            .unwrap();
        assert_eq!(request.header("APCA-API-KEY-ID"), Some("PK"));
        assert_eq!(request.header("APCA-API-SECRET-KEY"), Some("SK"));
        assert_eq!(request.header("Authorization"), None);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("User-Agent"), Some(USER_AGENT));

        let bearer = client("https://api.alpaca.markets/v2", Credentials::bearer("tok"));
        let request = bearer
            .build_request(HttpMethod::Get, "account", &[], None)
            .unwrap();
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header("APCA-API-KEY-ID"), None);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_null_params_are_omitted() {
        let c = client("https://api.alpaca.markets/v2", Credentials::bearer("t"));
        let request = c
            .build_request(
                HttpMethod::Get,
                "orders",
                &[("status", Some("open".to_string())), ("limit", None)],
                None,
            )
            .unwrap();
        assert_eq!(request.url.query(), Some("status=open"));
    }

    #[test]
    fn test_decode_unwraps_envelope() {
        let response = HttpResponse::new(200, r#"{"bars":{"AAPL":[]},"next_page_token":null}"#);
        let decoded: std::collections::HashMap<String, Vec<Value>> =
            decode_response("stocks/bars", &response).unwrap();
        assert!(decoded["AAPL"].is_empty());
    }

    #[test]
    fn test_decode_error_inside_success_status() {
        let response = HttpResponse::new(200, r#"{"code":40410000,"message":"asset not found"}"#);
        let err = decode_response::<Value>("assets/XYZ", &response).unwrap_err();
        assert!(matches!(err, AlpacaError::Server { code: Some(40410000), .. }));
    }

    #[test]
    fn test_decode_error_inside_envelope() {
        let response = HttpResponse::new(200, r#"{"quote":{"message":"no quote"}}"#);
        let err = decode_response::<Value>("stocks/AAPL/quotes/latest", &response).unwrap_err();
        assert!(err.is_server_error());
    }

    #[test]
    fn test_decode_schema_mismatch_is_distinct() {
        let response = HttpResponse::new(200, r#"{"unexpected":true}"#);
        let err = decode_response::<Vec<String>>("orders", &response).unwrap_err();
        assert!(matches!(err, AlpacaError::UnexpectedSchema { .. }));
    }

    #[test]
    fn test_decode_non_json_bodies() {
        let not_found = HttpResponse::new(404, "Not Found");
        assert!(matches!(
            decode_response::<Value>("orders/x", &not_found),
            Err(AlpacaError::Status { status: 404, .. })
        ));

        let garbage = HttpResponse::new(200, "<html>");
        assert!(matches!(
            decode_response::<Value>("orders", &garbage),
            Err(AlpacaError::UnexpectedSchema { .. })
        ));
    }

    #[test]
    fn test_without_nulls() {
        let params = json!({"symbol": "AAPL", "limit_price": null, "qty": "1"});
        let Value::Object(map) = params else {
            unreachable!()
        };
        let cleaned = without_nulls(map);
        assert_eq!(cleaned.len(), 2);
        assert!(!cleaned.contains_key("limit_price"));
    }
}
