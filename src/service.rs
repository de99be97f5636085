//! Background service task — single `select!` loop.
//!
//! The service owns all async I/O. It receives [`UiEvent`]s from the UI thread,
//! drives the pairing [`Connector`], queries balances over JSON-RPC and sends
//! [`ServiceEvent`]s back.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::{ServiceEvent, UiEvent};
use crate::networks::{NetworkDescriptor, NetworkTable};
use crate::pairing::types::TransactionRequest;
use crate::pairing::{Connector, PairingError, PairingEvent, PendingResponse};
use crate::rpc_client::{format_ether, ClientError, EthRpcClient};
use crate::session_store::SessionStore;

/// Value of the test transaction: 2 units of the native token, in wei.
pub const TEST_TX_VALUE: &str = "0x1BC16D674EC80000";

type TxOutcome = Result<Result<serde_json::Value, PairingError>, oneshot::error::RecvError>;

/// Run the service loop until the cancellation token fires.
pub async fn run(
    token: CancellationToken,
    mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
    svc_tx: mpsc::UnboundedSender<ServiceEvent>,
    config: Config,
) {
    let db_path = config.session_db_path();
    if let Some(parent) = db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let store = match SessionStore::open(&db_path) {
        Ok(store) => {
            log::info!("📂 Session database opened at: {}", db_path.display());
            Some(store)
        }
        Err(e) => {
            log::warn!("⚠️ Session database unavailable, sessions won't persist: {}", e);
            None
        }
    };

    let mut state = ServiceState::new(svc_tx, config, store);
    let mut pending_tx: Option<PendingResponse> = None;

    log::info!("🚀 Service loop started (bridge {})", state.config.bridge);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("🛑 Service loop shutting down");
                break;
            }

            Some(event) = next_pairing_event(&mut state.connector) => {
                if let Err(e) = state.on_pairing_event(event).await {
                    log::error!("❌ Pairing error: {}", e);
                    pending_tx = None;
                    state.fail(e);
                }
            }

            Some(outcome) = wait_pending(&mut pending_tx) => {
                pending_tx = None;
                state.on_transaction_outcome(outcome);
            }

            Some(event) = ui_rx.recv() => {
                match event {
                    UiEvent::Shutdown => break,

                    UiEvent::Connect => {
                        state.connect().await;
                    }

                    UiEvent::Disconnect => {
                        pending_tx = None;
                        state.kill_session();
                    }

                    UiEvent::SendTransaction => {
                        if pending_tx.is_some() {
                            log::warn!("Transaction already pending, ignoring");
                            continue;
                        }
                        match state.send_transaction() {
                            Ok(rx) => pending_tx = Some(rx),
                            Err(e) => state.emit(ServiceEvent::TransactionFailed(e.to_string())),
                        }
                    }
                }
            }
        }
    }

    // Leaving the session alive on the wallet side lets the next launch
    // resume it; only drop the socket.
    state.connector = None;
    log::info!("👋 Service loop exited");
}

async fn next_pairing_event(connector: &mut Option<Connector>) -> Option<PairingEvent> {
    match connector {
        Some(c) => c.next_event().await,
        None => std::future::pending().await,
    }
}

async fn wait_pending(pending: &mut Option<PendingResponse>) -> Option<TxOutcome> {
    match pending {
        Some(rx) => Some(rx.await),
        None => std::future::pending().await,
    }
}

/// Mutable state owned by the service loop.
struct ServiceState {
    svc_tx: mpsc::UnboundedSender<ServiceEvent>,
    config: Config,
    networks: NetworkTable,
    store: Option<SessionStore>,
    connector: Option<Connector>,
}

impl ServiceState {
    fn new(
        svc_tx: mpsc::UnboundedSender<ServiceEvent>,
        config: Config,
        store: Option<SessionStore>,
    ) -> Self {
        Self {
            svc_tx,
            networks: NetworkTable::new(config.networks.clone()),
            config,
            store,
            connector: None,
        }
    }

    fn emit(&self, event: ServiceEvent) {
        let _ = self.svc_tx.send(event);
    }

    /// Resume the stored session if there is one, otherwise request a new
    /// one and hand the URI to the UI.
    async fn connect(&mut self) {
        if self.connector.is_some() {
            log::warn!("Connect requested while a connector exists, ignoring");
            return;
        }

        if let Some(connector) = self.restore_session() {
            match (connector.chain_id(), connector.accounts().first().cloned()) {
                (Some(chain_id), Some(account)) if connector.connected() => {
                    self.connector = Some(connector);
                    self.on_connect(chain_id, &account).await;
                    self.emit(ServiceEvent::FetchingDone);
                    return;
                }
                _ => {
                    log::warn!("⚠️ Stored session is incomplete, starting fresh");
                    self.clear_store();
                }
            }
        }

        let mut connector =
            Connector::new(self.config.bridge.clone(), self.config.client_meta.clone());
        match connector.create_session() {
            Ok(uri) => {
                self.emit(ServiceEvent::DisplayUri(uri.to_string()));
                self.connector = Some(connector);
            }
            Err(e) => {
                log::error!("❌ Failed to create session: {}", e);
                self.emit(ServiceEvent::PairingFailed(e.to_string()));
            }
        }
    }

    fn restore_session(&self) -> Option<Connector> {
        let store = self.store.as_ref()?;
        let session = match store.load() {
            Ok(session) => session?,
            Err(e) => {
                log::warn!("⚠️ Failed to read stored session: {}", e);
                return None;
            }
        };
        match Connector::restore(session) {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("⚠️ Stored session unusable, starting fresh: {}", e);
                let _ = store.clear();
                None
            }
        }
    }

    async fn on_pairing_event(&mut self, event: PairingEvent) -> Result<(), PairingError> {
        match event {
            PairingEvent::Connect { chain_id, accounts }
            | PairingEvent::SessionUpdate { chain_id, accounts } => {
                self.persist();
                let account = accounts.into_iter().next().ok_or_else(|| {
                    PairingError::InvalidPayload("session has no accounts".to_string())
                })?;
                self.on_connect(chain_id, &account).await;
                self.emit(ServiceEvent::FetchingDone);
            }
            PairingEvent::Disconnect { error } => {
                if let Some(e) = error {
                    return Err(e);
                }
                self.reset();
                self.emit(ServiceEvent::Disconnected);
            }
            PairingEvent::TransportUp => self.emit(ServiceEvent::BridgeConnected),
            PairingEvent::TransportDown => self.emit(ServiceEvent::BridgeDisconnected),
        }
        Ok(())
    }

    /// Publish account and network, then the balance if the chain is supported.
    async fn on_connect(&mut self, chain_id: u64, account: &str) {
        let network = self.networks.lookup(chain_id);
        self.emit(ServiceEvent::Connected {
            account: account.to_string(),
            chain_id,
            network: network.clone(),
        });

        let Some(network) = network else {
            log::info!("⚠️ Chain {} is not supported", chain_id);
            return;
        };

        match fetch_balance(&network, account).await {
            Ok(balance) => {
                log::info!("💰 {} {} on {}", balance, network.native_currency_symbol, network.name);
                self.emit(ServiceEvent::BalanceUpdated(balance));
            }
            Err(e) => {
                log::warn!("⚠️ Balance fetch failed on {}: {}", network.name, e);
                self.emit(ServiceEvent::Error(format!("Failed to fetch balance: {}", e)));
            }
        }
    }

    fn send_transaction(&mut self) -> Result<PendingResponse, PairingError> {
        let connector = self.connector.as_mut().ok_or(PairingError::NotConnected)?;
        let account = connector
            .accounts()
            .first()
            .cloned()
            .ok_or(PairingError::NotConnected)?;
        connector.send_transaction(TransactionRequest {
            from: account.clone(),
            to: account,
            value: TEST_TX_VALUE.to_string(),
            data: None,
        })
    }

    fn on_transaction_outcome(&self, outcome: TxOutcome) {
        match outcome {
            Ok(Ok(value)) => {
                let hash = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                log::info!("✅ Transaction submitted: {}", hash);
                self.emit(ServiceEvent::TransactionSent { hash });
            }
            Ok(Err(e)) => {
                log::warn!("❌ Transaction failed: {}", e);
                self.emit(ServiceEvent::TransactionFailed(e.to_string()));
            }
            Err(_) => {
                self.emit(ServiceEvent::TransactionFailed(
                    PairingError::NotConnected.to_string(),
                ));
            }
        }
    }

    /// User pressed Disconnect: end the session on the wallet too.
    fn kill_session(&mut self) {
        if let Some(mut connector) = self.connector.take() {
            connector.kill_session();
        }
        self.reset();
        self.emit(ServiceEvent::Disconnected);
    }

    /// A pairing error escaped the event handler.
    fn fail(&mut self, error: PairingError) {
        self.reset();
        self.emit(ServiceEvent::PairingFailed(error.to_string()));
    }

    fn reset(&mut self) {
        self.connector = None;
        self.clear_store();
    }

    fn clear_store(&self) {
        if let Some(ref store) = self.store {
            if let Err(e) = store.clear() {
                log::warn!("Failed to clear stored session: {}", e);
            }
        }
    }

    fn persist(&self) {
        let (Some(store), Some(connector)) = (&self.store, &self.connector) else {
            return;
        };
        if let Some(session) = connector.to_persisted() {
            if let Err(e) = store.save(&session) {
                log::warn!("Failed to persist session: {}", e);
            }
        }
    }
}

/// Query the balance and format it in whole tokens.
async fn fetch_balance(network: &NetworkDescriptor, account: &str) -> Result<String, ClientError> {
    let client = EthRpcClient::new(network.rpc_url.as_str())?;
    let (balance, node_chain) = tokio::join!(client.get_balance(account), client.chain_id());
    match node_chain {
        Ok(id) if id != network.chain_id => log::warn!(
            "⚠️ {} reports chain {} but the table says {}",
            client.endpoint(),
            id,
            network.chain_id
        ),
        Ok(_) => {}
        Err(e) => log::debug!("eth_chainId failed: {}", e),
    }
    Ok(format_ether(balance?))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::ClientMeta;
    use crate::pairing::PersistedSession;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "0x6Be02d1d3665660d22FF9624b7BE0551ee1Ac91b";
    const LOCAL_CHAIN: u64 = 31337;

    fn service() -> (ServiceState, mpsc::UnboundedReceiver<ServiceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ServiceState::new(tx, Config::default(), None), rx)
    }

    /// An http URL on a port nothing listens on.
    fn dead_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}", port)
    }

    fn local_network(rpc_url: String) -> NetworkDescriptor {
        NetworkDescriptor {
            chain_id: LOCAL_CHAIN,
            name: "Local".to_string(),
            native_currency_symbol: "ETH".to_string(),
            rpc_url,
        }
    }

    fn local_config(rpc_url: String) -> Config {
        Config {
            bridge: dead_url(),
            networks: vec![local_network(rpc_url)],
            ..Config::default()
        }
    }

    fn stored_session(accounts: Vec<String>) -> PersistedSession {
        PersistedSession {
            bridge: dead_url(),
            key: "ab".repeat(32),
            client_id: "dapp-client".to_string(),
            client_meta: ClientMeta::default(),
            peer_id: "wallet-peer".to_string(),
            peer_name: "Test Wallet".to_string(),
            chain_id: LOCAL_CHAIN,
            accounts,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServiceEvent>) -> Vec<ServiceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_supported_chain_fetches_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"method": "eth_getBalance"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x1bc16d674ec80000"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"method": "eth_chainId"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 2, "result": "0x7a69"
            })))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ServiceState::new(tx, local_config(server.uri()), None);
        state
            .on_pairing_event(PairingEvent::Connect {
                chain_id: LOCAL_CHAIN,
                accounts: vec![ACCOUNT.to_string()],
            })
            .await
            .unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                ServiceEvent::Connected {
                    account: ACCOUNT.to_string(),
                    chain_id: LOCAL_CHAIN,
                    network: Some(local_network(server.uri())),
                },
                ServiceEvent::BalanceUpdated("2.0".to_string()),
                ServiceEvent::FetchingDone,
            ]
        );
    }

    #[tokio::test]
    async fn test_resume_stored_session_then_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("db")).unwrap();
        store.save(&stored_session(vec![ACCOUNT.to_string()])).unwrap();

        let rpc_url = dead_url();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ServiceState::new(tx, local_config(rpc_url.clone()), Some(store.clone()));

        state.connect().await;
        let events = drain(&mut rx);
        assert_eq!(events.len(), 3, "unexpected events {:?}", events);
        assert_eq!(
            events[0],
            ServiceEvent::Connected {
                account: ACCOUNT.to_string(),
                chain_id: LOCAL_CHAIN,
                network: Some(local_network(rpc_url)),
            }
        );
        match &events[1] {
            ServiceEvent::Error(msg) => assert!(msg.starts_with("Failed to fetch balance")),
            other => panic!("expected balance error, got {:?}", other),
        }
        assert_eq!(events[2], ServiceEvent::FetchingDone);
        assert!(state.connector.as_ref().is_some_and(|c| c.connected()));

        state.kill_session();
        assert_eq!(drain(&mut rx), vec![ServiceEvent::Disconnected]);
        assert!(state.connector.is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_session_without_account_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("db")).unwrap();
        store.save(&stored_session(Vec::new())).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ServiceState::new(tx, local_config(dead_url()), Some(store.clone()));

        state.connect().await;
        match drain(&mut rx).as_slice() {
            [ServiceEvent::DisplayUri(uri)] => assert!(uri.starts_with("wc:")),
            other => panic!("expected a fresh pairing URI, got {:?}", other),
        }
        assert!(store.load().unwrap().is_none());
        assert!(state.connector.as_ref().is_some_and(|c| !c.connected()));
    }

    #[tokio::test]
    async fn test_connect_unsupported_chain_skips_balance() {
        let (mut state, mut rx) = service();
        state
            .on_pairing_event(PairingEvent::Connect {
                chain_id: 1,
                accounts: vec!["0xabc".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            ServiceEvent::Connected {
                account: "0xabc".to_string(),
                chain_id: 1,
                network: None
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ServiceEvent::FetchingDone);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_with_error_propagates() {
        let (mut state, mut rx) = service();
        let err = state
            .on_pairing_event(PairingEvent::Disconnect {
                error: Some(PairingError::SessionRejected),
            })
            .await
            .unwrap_err();
        assert_eq!(err, PairingError::SessionRejected);
        // The handler stopped before resetting.
        assert!(rx.try_recv().is_err());

        state.fail(err);
        assert_eq!(
            rx.try_recv().unwrap(),
            ServiceEvent::PairingFailed("Session Rejected".to_string())
        );
    }

    #[tokio::test]
    async fn test_disconnect_without_error_resets() {
        let (mut state, mut rx) = service();
        state
            .on_pairing_event(PairingEvent::Disconnect { error: None })
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), ServiceEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_without_accounts_is_error() {
        let (mut state, _rx) = service();
        let err = state
            .on_pairing_event(PairingEvent::SessionUpdate {
                chain_id: 1287,
                accounts: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PairingError::InvalidPayload(_)));
    }

    #[test]
    fn test_send_without_connector() {
        let (mut state, _rx) = service();
        assert_eq!(
            state.send_transaction().unwrap_err(),
            PairingError::NotConnected
        );
    }

    #[test]
    fn test_transaction_outcomes() {
        let (state, mut rx) = service();

        state.on_transaction_outcome(Ok(Ok(serde_json::json!("0xfeed"))));
        assert_eq!(
            rx.try_recv().unwrap(),
            ServiceEvent::TransactionSent {
                hash: "0xfeed".to_string()
            }
        );

        state.on_transaction_outcome(Ok(Err(PairingError::Rpc {
            code: -32000,
            message: "User rejected the transaction".to_string(),
        })));
        assert_eq!(
            rx.try_recv().unwrap(),
            ServiceEvent::TransactionFailed("User rejected the transaction".to_string())
        );
    }

    #[test]
    fn test_tx_value_is_two_tokens() {
        let wei = crate::rpc_client::parse_quantity(TEST_TX_VALUE).unwrap();
        assert_eq!(format_ether(wei), "2.0");
    }
}
