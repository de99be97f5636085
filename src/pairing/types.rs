//! Wire types: bridge socket frames and the JSON-RPC messages carried
//! (encrypted) inside them.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ClientMeta;

pub const METHOD_SESSION_REQUEST: &str = "wc_sessionRequest";
pub const METHOD_SESSION_UPDATE: &str = "wc_sessionUpdate";
pub const METHOD_SEND_TRANSACTION: &str = "eth_sendTransaction";

/// Frame exchanged with the bridge server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: SocketMessageKind,
    pub payload: String,
    #[serde(default)]
    pub silent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketMessageKind {
    Pub,
    Sub,
    Ack,
}

impl SocketMessage {
    pub fn subscribe(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            kind: SocketMessageKind::Sub,
            payload: String::new(),
            silent: true,
        }
    }

    pub fn publish(topic: &str, payload: String, silent: bool) -> Self {
        Self {
            topic: topic.to_string(),
            kind: SocketMessageKind::Pub,
            payload,
            silent,
        }
    }
}

/// Peer description exchanged during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerMeta {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

impl From<&ClientMeta> for PeerMeta {
    fn from(meta: &ClientMeta) -> Self {
        Self {
            name: meta.name.clone(),
            description: meta.description.clone(),
            url: meta.url.clone(),
            icons: meta.icons.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            id: payload_id(),
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: u64,
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

/// Anything the wallet can send us. Requests carry a `method`, responses
/// do not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
}

/// Params of `wc_sessionRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequestParams {
    pub peer_id: String,
    pub peer_meta: PeerMeta,
    pub chain_id: Option<u64>,
}

/// Result of `wc_sessionRequest` and params of `wc_sessionUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub approved: bool,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub network_id: Option<u64>,
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_meta: Option<PeerMeta>,
}

impl SessionParams {
    /// Params that tell the peer the session is over.
    pub fn rejected() -> Self {
        Self::default()
    }
}

/// `eth_sendTransaction` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Millisecond timestamp with three random digits appended.
pub fn payload_id() -> u64 {
    let millis = chrono::Utc::now().timestamp_millis() as u64;
    let extra: u64 = rand::thread_rng().gen_range(0..1000);
    millis * 1000 + extra
}
