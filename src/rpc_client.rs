//! Ethereum JSON-RPC client
//!
//! Talks JSON-RPC 2.0 over HTTP to the public endpoint of a supported
//! network. Only the calls the demo needs are implemented.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Decimals of the native token on every supported network.
pub const ETHER_DECIMALS: u32 = 18;

/// Parse a hex quantity (`0x1bc16d674ec80000`) into an integer.
pub fn parse_quantity(s: &str) -> Result<u128, ClientError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ClientError::InvalidResponse(format!("not a hex quantity: {}", s)))?;
    if digits.is_empty() {
        return Err(ClientError::InvalidResponse(format!(
            "empty hex quantity: {}",
            s
        )));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ClientError::InvalidResponse(format!("bad hex quantity {}: {}", s, e)))
}

/// Format a base-unit amount as a decimal string with `decimals` places,
/// trimming trailing zeros but keeping at least one fractional digit.
pub fn format_units(value: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = value / base;
    let frac = value % base;

    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

/// Format wei as ether.
pub fn format_ether(wei: u128) -> String {
    format_units(wei, ETHER_DECIMALS)
}

#[derive(Debug, Clone)]
pub struct EthRpcClient {
    rpc_url: String,
    client: Client,
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl EthRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, ClientError> {
        let rpc_url = rpc_url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        log::debug!("📡 JSON-RPC client initialized: {}", rpc_url);

        Ok(Self { rpc_url, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.rpc_url
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        log::debug!("→ RPC {}: {:?}", method, request.params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::http(response.status().as_u16()));
        }

        let rpc_response: JsonRpcResponse = response.json().await.map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse JSON-RPC response: {}", e))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(ClientError::RpcError(error.code, error.message));
        }

        rpc_response
            .result
            .ok_or_else(|| ClientError::InvalidResponse("No result in JSON-RPC response".into()))
    }

    /// Balance of `address` at the latest block, in wei.
    pub async fn get_balance(&self, address: &str) -> Result<u128, ClientError> {
        let result = self
            .rpc_call("eth_getBalance", serde_json::json!([address, "latest"]))
            .await?;
        let wei = quantity_from_value(&result)?;
        log::info!("✅ Balance of {}: {} wei", address, wei);
        Ok(wei)
    }

    /// Chain ID reported by the node.
    pub async fn chain_id(&self) -> Result<u64, ClientError> {
        let result = self.rpc_call("eth_chainId", serde_json::json!([])).await?;
        let id = quantity_from_value(&result)?;
        u64::try_from(id).map_err(|_| ClientError::InvalidResponse(format!("chain id {}", id)))
    }
}

fn quantity_from_value(value: &serde_json::Value) -> Result<u128, ClientError> {
    value
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected hex string, got {}", value)))
        .and_then(parse_quantity)
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    #[error("RPC error {0}: {1}")]
    RpcError(i64, String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn http(status: u16) -> Self {
        let message = match status {
            400 => "Bad Request",
            404 => "Not Found",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown Error",
        };
        Self::Http(status, message.to_string())
    }
}
