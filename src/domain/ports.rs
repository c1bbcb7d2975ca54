use crate::domain::errors::Result;
use crate::domain::market::FeedFamily;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headers whose values never appear in logs or `Debug` output.
const REDACTED_HEADERS: &[&str] = &["apca-api-key-id", "apca-api-secret-key", "authorization"];

/// One fully prepared outbound exchange.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if REDACTED_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                    (key.as_str(), "<redacted>")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP exchange. Implementations must not retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Remembers the last data-feed tier that answered, per asset family.
///
/// Values are advisory: concurrent fallback chains may overwrite each other
/// (last writer wins) but every write replaces the whole value.
pub trait FeedStore: Send + Sync {
    fn load(&self, family: FeedFamily) -> Option<String>;
    fn save(&self, family: FeedFamily, tier: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_credentials() {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: Url::parse("https://paper-api.alpaca.markets/v2/account").unwrap(),
            headers: vec![
                ("APCA-API-KEY-ID".to_string(), "PKTEST".to_string()),
                ("APCA-API-SECRET-KEY".to_string(), "s3cr3t".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: None,
            timeout: Duration::from_secs(10),
        };

        let debug = format!("{:?}", request);
        assert!(!debug.contains("PKTEST"));
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("application/json"));
        assert_eq!(request.header("apca-api-key-id"), Some("PKTEST"));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "{}").is_success());
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(403, "{}").is_success());
    }
}
