//! Signal-cli daemon HTTP client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::types::{Envelope, GroupRecord, ReceiveEntry, SendParams, SendResult};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Parameters for the `receive` RPC call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiveParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    /// Receive timeout in seconds.
    timeout: u64,
}

/// Parameters for the `listGroups` RPC call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListGroupsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
}

/// Client for communicating with the signal-cli daemon.
#[derive(Clone)]
pub struct SignalClient {
    http: Client,
    config: DaemonConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl SignalClient {
    /// Connect to the signal-cli daemon and verify it is reachable.
    pub async fn connect(config: DaemonConfig) -> Result<Self, DaemonError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(DaemonError::Http)?;

        let client = Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        };

        if client.health_check().await? {
            client.connected.store(true, Ordering::SeqCst);
            info!("Connected to signal-cli daemon at {}", client.config.base_url);
        } else {
            return Err(DaemonError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if currently connected to the daemon.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the daemon.
    pub async fn health_check(&self) -> Result<bool, DaemonError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(DaemonError::Http(e))
            }
        }
    }

    /// Drain queued envelopes, waiting up to `timeout` for new ones.
    ///
    /// The daemon returns whatever is queued plus anything that arrives
    /// within the timeout window; an empty vec means the queue is empty.
    pub async fn receive(&self, timeout: Duration) -> Result<Vec<Envelope>, DaemonError> {
        let params = ReceiveParams {
            account: self.config.account.clone(),
            timeout: timeout.as_secs(),
        };
        let entries: Vec<ReceiveEntry> = self.rpc_call("receive", Some(params)).await?;
        debug!("Received {} envelopes", entries.len());
        Ok(entries.into_iter().map(|entry| entry.envelope).collect())
    }

    /// List all groups the account is a member of.
    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, DaemonError> {
        let params = ListGroupsParams {
            account: self.config.account.clone(),
        };
        self.rpc_call("listGroups", Some(params)).await
    }

    /// Send a message using the full SendParams structure.
    pub async fn send(&self, mut params: SendParams) -> Result<SendResult, DaemonError> {
        if params.account.is_none() {
            params.account = self.config.account.clone();
        }
        self.rpc_call("send", Some(params)).await
    }

    /// Get the configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Make a JSON-RPC call to the daemon.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, DaemonError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(DaemonError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DaemonError::Connection(format!("HTTP {}: {}", status, body)));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(DaemonError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(DaemonError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or_else(|| DaemonError::Rpc {
            code: -1,
            message: "No result in response".to_string(),
        })
    }
}

impl std::fmt::Debug for SignalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}
