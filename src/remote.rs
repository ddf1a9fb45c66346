//! Outbound network call collaborator
//!
//! One orchestrator operation issues a single outbound request through an
//! injected client abstraction bound by the caller's cancellation scope. The
//! core never interprets response bodies, only success/failure and status.

use crate::error::{Result, TaskError};
use crate::scope::CancelScope;
use async_trait::async_trait;
use std::time::Duration;

/// Component name used for remote-call errors
const COMPONENT: &str = "remote";

/// Default per-request timeout applied by [`HttpCaller`]
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client abstraction for the single outbound request an operation may issue
///
/// Implementations must observe the scope: a call must not outlive the point
/// the scope becomes done.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    /// Issue one outbound request
    async fn call(&self, scope: &CancelScope) -> Result<()>;
}

/// HTTP implementation of [`RemoteCaller`] backed by `reqwest`
///
/// Sends a single GET request. Transient transport failures (timeouts,
/// connection errors) and retryable HTTP statuses (408, 429, 5xx) surface as
/// retryable errors; every other non-success status is permanent.
pub struct HttpCaller {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCaller {
    /// Create a caller for the given URL with the default request timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn classify_status(status: reqwest::StatusCode) -> TaskError {
        let message = format!("request returned status {status}");
        let err = TaskError::new(crate::error::code::REMOTE_STATUS, COMPONENT, message);
        // Server-side and throttling statuses are worth retrying; the rest
        // will not get better on their own
        let transient = status.is_server_error()
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        err.with_retryable(transient)
    }

    fn classify_transport(source: &reqwest::Error) -> TaskError {
        let err = TaskError::new(
            crate::error::code::REMOTE_TRANSPORT,
            COMPONENT,
            format!("request failed: {source}"),
        );
        err.with_retryable(source.is_timeout() || source.is_connect())
    }
}

#[async_trait]
impl RemoteCaller for HttpCaller {
    async fn call(&self, scope: &CancelScope) -> Result<()> {
        if let Some(scope_err) = scope.done_reason() {
            return Err(scope_err);
        }

        let request = self.client.get(&self.url).timeout(self.timeout).send();

        let response = tokio::select! {
            res = request => res,
            _ = scope.done() => {
                return Err(scope
                    .done_reason()
                    .unwrap_or_else(|| TaskError::cancelled(COMPONENT)));
            }
        };

        match response {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(Self::classify_status(resp.status())),
            Err(source) => Err(Self::classify_transport(&source)),
        }
    }
}
