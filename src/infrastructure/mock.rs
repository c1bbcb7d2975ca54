use crate::domain::errors::{AlpacaError, Result};
use crate::domain::ports::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(HttpResponse),
    Fail(String),
}

/// Transport that replays scripted replies in order and records every
/// request it receives. Clones share the same script and log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply with `status` and `body`.
    pub fn reply(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push_reply(status, body);
        self
    }

    /// Queue a transport-level failure (no response at all).
    pub fn fail(self, reason: impl Into<String>) -> Self {
        lock(&self.script).push_back(Scripted::Fail(reason.into()));
        self
    }

    pub fn push_reply(&self, status: u16, body: impl Into<Vec<u8>>) {
        lock(&self.script).push_back(Scripted::Reply(HttpResponse::new(status, body)));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Value of query parameter `name` on each recorded request, in order.
    pub fn query_values(&self, name: &str) -> Vec<Option<String>> {
        lock(&self.requests)
            .iter()
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("MockTransport: {} {}", request.method, request.url);
        lock(&self.requests).push(request);

        match lock(&self.script).pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(reason)) => Err(AlpacaError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                reason,
            ))),
            None => Err(AlpacaError::transport(std::io::Error::other(
                "MockTransport: no scripted reply left",
            ))),
        }
    }
}
