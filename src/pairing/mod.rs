//! WalletConnect v1 pairing client.
//!
//! [`Connector`] owns one pairing session: it publishes the session request,
//! turns the wallet's answers into [`PairingEvent`]s, forwards transaction
//! requests, and tells the wallet when we hang up. It does no I/O of its own
//! beyond queuing frames on the [`BridgeSocket`].

pub mod crypto;
pub mod transport;
pub mod types;
pub mod uri;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::ClientMeta;
use crypto::{CryptoError, EncryptionPayload, SymKey};
use transport::{BridgeSocket, TransportEvent};
use types::{
    JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, PeerMeta, SessionParams,
    SessionRequestParams, SocketMessage, TransactionRequest, METHOD_SEND_TRANSACTION,
    METHOD_SESSION_REQUEST, METHOD_SESSION_UPDATE,
};
use uri::WcUri;

/// Resolves with the wallet's answer to a request.
pub type PendingResponse = oneshot::Receiver<Result<serde_json::Value, PairingError>>;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PairingError {
    #[error("Session Rejected")]
    SessionRejected,

    #[error("Session currently disconnected")]
    NotConnected,

    #[error("Session already connected")]
    AlreadyConnected,

    #[error("Bridge connection closed")]
    TransportClosed,

    /// Error returned by the wallet; displays as the wallet's own message.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),
}

/// What the service needs to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum PairingEvent {
    /// Wallet approved the session.
    Connect { chain_id: u64, accounts: Vec<String> },
    /// Wallet switched chain or account.
    SessionUpdate { chain_id: u64, accounts: Vec<String> },
    /// Session ended, by the wallet or because it was rejected.
    Disconnect { error: Option<PairingError> },
    /// Bridge socket came up or went down.
    TransportUp,
    TransportDown,
}

/// Everything needed to pick a session back up after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub bridge: String,
    pub key: String,
    pub client_id: String,
    pub client_meta: ClientMeta,
    pub peer_id: String,
    pub peer_name: String,
    pub chain_id: u64,
    pub accounts: Vec<String>,
}

pub struct Connector {
    bridge: String,
    key: SymKey,
    client_id: String,
    client_meta: ClientMeta,
    handshake_topic: Option<String>,
    handshake_id: Option<u64>,
    peer_id: Option<String>,
    peer_meta: Option<PeerMeta>,
    chain_id: Option<u64>,
    accounts: Vec<String>,
    connected: bool,
    pending: HashMap<u64, oneshot::Sender<Result<serde_json::Value, PairingError>>>,
    socket: BridgeSocket,
    transport_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("bridge", &self.bridge)
            .field("client_id", &self.client_id)
            .field("peer_id", &self.peer_id)
            .field("chain_id", &self.chain_id)
            .field("connected", &self.connected)
            .finish()
    }
}

impl Connector {
    /// Fresh connector with a new key and client ID, listening on the bridge.
    pub fn new(bridge: String, client_meta: ClientMeta) -> Self {
        let client_id = uuid::Uuid::new_v4().to_string();
        let (socket, transport_rx) = BridgeSocket::start(&bridge, vec![client_id.clone()]);
        Self::with_socket(
            bridge,
            SymKey::generate(),
            client_id,
            client_meta,
            socket,
            Some(transport_rx),
        )
    }

    /// Rebuild a connected session from storage.
    pub fn restore(session: PersistedSession) -> Result<Self, PairingError> {
        let key = SymKey::from_hex(&session.key)?;
        let (socket, transport_rx) =
            BridgeSocket::start(&session.bridge, vec![session.client_id.clone()]);
        let mut connector = Self::with_socket(
            session.bridge,
            key,
            session.client_id,
            session.client_meta,
            socket,
            Some(transport_rx),
        );
        connector.peer_id = Some(session.peer_id);
        connector.peer_meta = Some(PeerMeta {
            name: session.peer_name,
            ..PeerMeta::default()
        });
        connector.chain_id = Some(session.chain_id);
        connector.accounts = session.accounts;
        connector.connected = true;
        log::info!("♻️ Restored session with {}", connector.peer_name());
        Ok(connector)
    }

    fn with_socket(
        bridge: String,
        key: SymKey,
        client_id: String,
        client_meta: ClientMeta,
        socket: BridgeSocket,
        transport_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    ) -> Self {
        Self {
            bridge,
            key,
            client_id,
            client_meta,
            handshake_topic: None,
            handshake_id: None,
            peer_id: None,
            peer_meta: None,
            chain_id: None,
            accounts: Vec::new(),
            connected: false,
            pending: HashMap::new(),
            socket,
            transport_rx,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn peer_name(&self) -> &str {
        self.peer_meta
            .as_ref()
            .map(|m| m.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("wallet")
    }

    /// Publish a session request on a new handshake topic and return the URI
    /// the wallet has to scan.
    pub fn create_session(&mut self) -> Result<WcUri, PairingError> {
        if self.connected {
            return Err(PairingError::AlreadyConnected);
        }

        let handshake_topic = uuid::Uuid::new_v4().to_string();
        let request = JsonRpcRequest::new(
            METHOD_SESSION_REQUEST,
            serde_json::to_value([SessionRequestParams {
                peer_id: self.client_id.clone(),
                peer_meta: PeerMeta::from(&self.client_meta),
                chain_id: None,
            }])
            .map_err(|e| PairingError::InvalidPayload(e.to_string()))?,
        );

        self.handshake_id = Some(request.id);
        self.publish(&handshake_topic, &request, true)?;
        self.handshake_topic = Some(handshake_topic.clone());

        let uri = WcUri::new(handshake_topic, self.bridge.clone(), self.key.clone());
        log::info!("🔗 Session requested, waiting for wallet");
        Ok(uri)
    }

    /// Ask the wallet to sign and submit a transaction. The returned receiver
    /// resolves with the transaction hash or the wallet's error.
    pub fn send_transaction(
        &mut self,
        tx: TransactionRequest,
    ) -> Result<PendingResponse, PairingError> {
        let peer_id = self.connected_peer()?.to_string();
        let request = JsonRpcRequest::new(
            METHOD_SEND_TRANSACTION,
            serde_json::to_value([tx]).map_err(|e| PairingError::InvalidPayload(e.to_string()))?,
        );

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(request.id, reply_tx);
        if let Err(e) = self.publish(&peer_id, &request, false) {
            self.pending.remove(&request.id);
            return Err(e);
        }
        log::info!("📤 Transaction request {} sent to {}", request.id, self.peer_name());
        Ok(reply_rx)
    }

    /// Tell the wallet the session is over and stop listening.
    pub fn kill_session(&mut self) {
        if let Some(peer_id) = self.peer_id.clone() {
            let request = JsonRpcRequest::new(
                METHOD_SESSION_UPDATE,
                serde_json::json!([SessionParams::rejected()]),
            );
            if let Err(e) = self.publish(&peer_id, &request, true) {
                log::warn!("Failed to notify wallet of disconnect: {}", e);
            }
        }
        self.drop_session();
        self.socket.close();
        log::info!("🔌 Session killed");
    }

    pub fn to_persisted(&self) -> Option<PersistedSession> {
        if !self.connected {
            return None;
        }
        Some(PersistedSession {
            bridge: self.bridge.clone(),
            key: self.key.to_hex(),
            client_id: self.client_id.clone(),
            client_meta: self.client_meta.clone(),
            peer_id: self.peer_id.clone()?,
            peer_name: self.peer_name().to_string(),
            chain_id: self.chain_id?,
            accounts: self.accounts.clone(),
        })
    }

    /// Wait for the next event worth reporting. `None` once the transport is
    /// gone for good.
    pub async fn next_event(&mut self) -> Option<PairingEvent> {
        loop {
            let event = self.transport_rx.as_mut()?.recv().await?;
            if let Some(pairing_event) = self.handle_transport(event) {
                return Some(pairing_event);
            }
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) -> Option<PairingEvent> {
        match event {
            TransportEvent::Connected(_) => Some(PairingEvent::TransportUp),
            TransportEvent::Disconnected(_) => Some(PairingEvent::TransportDown),
            TransportEvent::Message(msg) => {
                if msg.topic != self.client_id {
                    log::debug!("Ignoring message for foreign topic {}", msg.topic);
                    return None;
                }
                match self.decode(&msg.payload) {
                    Ok(message) => self.handle_message(message),
                    Err(e) => {
                        log::warn!("⚠️ Dropping bridge payload: {}", e);
                        None
                    }
                }
            }
        }
    }

    fn handle_message(&mut self, message: JsonRpcMessage) -> Option<PairingEvent> {
        match message {
            JsonRpcMessage::Response(resp) if Some(resp.id) == self.handshake_id => {
                self.handshake_id = None;
                self.handle_session_response(resp)
            }
            JsonRpcMessage::Response(resp) => {
                match self.pending.remove(&resp.id) {
                    Some(tx) => {
                        let _ = tx.send(response_result(resp));
                    }
                    None => log::debug!("Response {} matches no pending request", resp.id),
                }
                None
            }
            JsonRpcMessage::Request(req) if req.method == METHOD_SESSION_UPDATE => {
                let params = match first_param::<SessionParams>(&req.params) {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("⚠️ Bad wc_sessionUpdate: {}", e);
                        return None;
                    }
                };
                self.handle_session_update(params)
            }
            JsonRpcMessage::Request(req) => {
                log::debug!("Ignoring wallet request {}", req.method);
                None
            }
        }
    }

    fn handle_session_response(&mut self, resp: JsonRpcResponse) -> Option<PairingEvent> {
        let params = match response_result(resp)
            .and_then(|v| serde_json::from_value::<SessionParams>(v).map_err(invalid))
        {
            Ok(p) if p.approved => p,
            Ok(_) | Err(_) => {
                log::info!("🚫 Wallet rejected the session");
                self.drop_session();
                return Some(PairingEvent::Disconnect {
                    error: Some(PairingError::SessionRejected),
                });
            }
        };

        self.peer_id = params.peer_id;
        self.peer_meta = params.peer_meta;
        self.handshake_topic = None;

        let (chain_id, accounts) = match (params.chain_id, params.accounts) {
            (Some(chain_id), Some(accounts)) if !accounts.is_empty() => (chain_id, accounts),
            _ => {
                self.drop_session();
                return Some(PairingEvent::Disconnect {
                    error: Some(PairingError::InvalidPayload(
                        "approval without chain ID or accounts".to_string(),
                    )),
                });
            }
        };

        if self.peer_id.is_none() {
            self.drop_session();
            return Some(PairingEvent::Disconnect {
                error: Some(PairingError::InvalidPayload(
                    "approval without peer ID".to_string(),
                )),
            });
        }

        self.chain_id = Some(chain_id);
        self.accounts = accounts.clone();
        self.connected = true;
        log::info!("✅ {} approved session on chain {}", self.peer_name(), chain_id);
        Some(PairingEvent::Connect { chain_id, accounts })
    }

    fn handle_session_update(&mut self, params: SessionParams) -> Option<PairingEvent> {
        if !params.approved {
            log::info!("🔌 Wallet ended the session");
            self.drop_session();
            return Some(PairingEvent::Disconnect { error: None });
        }
        if !self.connected {
            return None;
        }
        if let Some(chain_id) = params.chain_id {
            self.chain_id = Some(chain_id);
        }
        if let Some(accounts) = params.accounts {
            self.accounts = accounts;
        }
        let chain_id = self.chain_id?;
        log::info!("🔄 Session updated: chain {}", chain_id);
        Some(PairingEvent::SessionUpdate {
            chain_id,
            accounts: self.accounts.clone(),
        })
    }

    fn drop_session(&mut self) {
        self.connected = false;
        self.peer_id = None;
        self.peer_meta = None;
        self.chain_id = None;
        self.accounts.clear();
        self.handshake_topic = None;
        self.handshake_id = None;
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(PairingError::NotConnected));
        }
    }

    fn connected_peer(&self) -> Result<&str, PairingError> {
        match (&self.peer_id, self.connected) {
            (Some(peer), true) => Ok(peer),
            _ => Err(PairingError::NotConnected),
        }
    }

    fn publish<T: Serialize>(
        &self,
        topic: &str,
        message: &T,
        silent: bool,
    ) -> Result<(), PairingError> {
        let json = serde_json::to_vec(message).map_err(invalid)?;
        let payload = crypto::encrypt(&json, &self.key);
        let payload = serde_json::to_string(&payload).map_err(invalid)?;
        self.socket.send(SocketMessage::publish(topic, payload, silent))
    }

    fn decode(&self, payload: &str) -> Result<JsonRpcMessage, PairingError> {
        let encrypted: EncryptionPayload = serde_json::from_str(payload).map_err(invalid)?;
        let plaintext = crypto::decrypt(&encrypted, &self.key)?;
        serde_json::from_slice(&plaintext).map_err(invalid)
    }
}

fn invalid(e: serde_json::Error) -> PairingError {
    PairingError::InvalidPayload(e.to_string())
}

fn response_result(resp: JsonRpcResponse) -> Result<serde_json::Value, PairingError> {
    if let Some(error) = resp.error {
        return Err(PairingError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    resp.result
        .ok_or_else(|| PairingError::InvalidPayload("response without result".to_string()))
}

fn first_param<T: serde::de::DeserializeOwned>(
    params: &serde_json::Value,
) -> Result<T, PairingError> {
    let first = params
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| PairingError::InvalidPayload("missing params".to_string()))?;
    serde_json::from_value(first.clone()).map_err(invalid)
}
