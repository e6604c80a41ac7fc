//! JSON-RPC transport for Ethereum-compatible endpoints.

use std::time::Duration;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{
    confirmation::{RetryPolicy, retry_bounded},
    error::{LifecycleError, Result},
};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC error code used by geth, reth and anvil for execution reverts.
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// HTTP JSON-RPC client bound to one endpoint.
///
/// Read requests made through [`RpcClient::call`] are retried on transport
/// failures; [`RpcClient::request`] makes exactly one attempt.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    retry: RetryPolicy,
}

impl RpcClient {
    pub fn new(url: Url, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| LifecycleError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { http, url, retry })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Idempotent request with bounded retry on [`LifecycleError::RpcUnavailable`].
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        retry_bounded(
            method,
            &self.retry,
            || self.request(method, params.clone()),
            LifecycleError::is_retryable,
        )
        .await
    }

    /// Make a single JSON-RPC request and deserialize the result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        let unavailable = |reason: String| LifecycleError::RpcUnavailable {
            method: method.to_string(),
            reason,
        };

        let response = self
            .http
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(unavailable(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed response (HTTP {status}): {e}")))?;

        if let Some(error) = body.get("error") {
            let error: RpcErrorBody = serde_json::from_value(error.clone()).map_err(|e| {
                unavailable(format!("malformed error object: {e}"))
            })?;
            return Err(classify_error(method, error));
        }

        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| unavailable("no result in response".to_string()))?;

        serde_json::from_value(result).map_err(|e| LifecycleError::Rpc {
            method: method.to_string(),
            code: 0,
            message: format!("failed to deserialize result: {e}"),
        })
    }
}

/// Split node errors into reverts and everything else.
fn classify_error(method: &str, error: RpcErrorBody) -> LifecycleError {
    let is_revert = error.code == EXECUTION_REVERTED_CODE
        || error.message.to_ascii_lowercase().contains("revert");

    if is_revert {
        let reason = match error.data {
            Some(Value::String(data)) => format!("{} ({data})", error.message),
            _ => error.message,
        };
        return LifecycleError::Reverted { hash: None, reason };
    }

    LifecycleError::Rpc {
        method: method.to_string(),
        code: error.code,
        message: error.message,
    }
}
