use crate::domain::errors::{AlpacaError, Result};
use crate::domain::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use reqwest::{Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::time::Duration;
use tracing::trace;
use url::Url;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a pooled HTTP client. Timeouts are set per request and no
    /// retry middleware is installed: feed fallback is the only retry policy.
    pub fn create_client() -> ClientWithMiddleware {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client).build()
    }
}

/// Build `base_url?name=value&...`, omitting parameters whose value is `None`.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, Option<V>)]) -> Result<Url>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base_url).map_err(|source| AlpacaError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;

    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_ref(), v.as_ref())))
        .collect();

    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url)
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// [`HttpTransport`] over reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: HttpClientFactory::create_client(),
        }
    }

    pub fn with_client(client: ClientWithMiddleware) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(method(request.method), request.url.clone())
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        trace!(
            "ReqwestTransport: {} {} -> {} ({} bytes)",
            request.method,
            request.url.path(),
            status,
            body.len()
        );

        Ok(HttpResponse { status, body })
    }
}
