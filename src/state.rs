//! Application state — plain data, no async, no Arc.
//!
//! `AppState` holds everything the UI needs to render. The service task sends
//! `ServiceEvent`s which are applied via `AppState::apply()`. The UI reads
//! fields directly — no locking, no channels.

use crate::events::ServiceEvent;
use crate::view::qr::QrGrid;

/// The connected account as the UI shows it. Every field is empty unless a
/// pairing is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    pub balance: Option<String>,
    pub supported: bool,
    pub network_name: Option<String>,
    pub token_symbol: Option<String>,
    pub error: Option<String>,
    pub fetching: bool,
}

/// All application state needed for rendering.
#[derive(Debug, Default)]
pub struct AppState {
    pub session: Session,

    /// A connector exists in the service task.
    pub paired: bool,

    // -- Pairing handshake --
    pub pairing_uri: Option<String>,
    pub pairing_qr: Option<QrGrid>,
    pub bridge_connected: bool,

    /// Why the last pairing ended, shown until the next Connect.
    pub pairing_error: Option<String>,

    // -- Transaction --
    pub sending: bool,
    pub last_tx_hash: Option<String>,
}

impl AppState {
    /// The Connect button was pressed.
    pub fn begin_connect(&mut self) {
        self.pairing_error = None;
        self.paired = true;
        self.session.fetching = true;
    }

    /// The Send Transaction button was pressed.
    pub fn begin_send(&mut self) {
        self.session.error = None;
        self.sending = true;
    }

    /// Clear the session and every pairing artifact.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Message for the error banner, if any.
    pub fn error(&self) -> Option<&str> {
        self.session
            .error
            .as_deref()
            .or(self.pairing_error.as_deref())
    }

    /// Connected data is shown once a connector exists and fetching is over.
    pub fn show_account(&self) -> bool {
        self.paired && !self.session.fetching
    }

    pub fn apply(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Disconnected => {
                self.reset();
                return;
            }
            ServiceEvent::PairingFailed(message) => {
                self.reset();
                self.pairing_error = Some(message);
                return;
            }
            _ => {}
        }

        // Anything else belongs to a pairing the user may already have
        // dropped.
        if !self.paired {
            log::debug!("Ignoring {:?} with no active pairing", event);
            return;
        }

        match event {
            ServiceEvent::DisplayUri(uri) => {
                self.pairing_qr = QrGrid::encode(&uri);
                self.pairing_uri = Some(uri);
            }
            ServiceEvent::Connected {
                account,
                chain_id,
                network,
            } => {
                self.pairing_uri = None;
                self.pairing_qr = None;
                self.session.account = Some(account);
                self.session.chain_id = Some(chain_id);
                match network {
                    Some(n) => {
                        self.session.supported = true;
                        self.session.network_name = Some(n.name);
                        self.session.token_symbol = Some(n.native_currency_symbol);
                    }
                    None => {
                        self.session.supported = false;
                        self.session.network_name = None;
                        self.session.token_symbol = None;
                        self.session.balance = None;
                    }
                }
            }
            ServiceEvent::BalanceUpdated(balance) => {
                self.session.balance = Some(balance);
            }
            ServiceEvent::FetchingDone => {
                self.session.fetching = false;
            }
            ServiceEvent::BridgeConnected => {
                self.bridge_connected = true;
            }
            ServiceEvent::BridgeDisconnected => {
                self.bridge_connected = false;
            }
            ServiceEvent::TransactionSent { hash } => {
                self.sending = false;
                self.last_tx_hash = Some(hash);
            }
            ServiceEvent::TransactionFailed(message) => {
                self.sending = false;
                self.session.error = Some(message);
            }
            ServiceEvent::Error(message) => {
                self.session.error = Some(message);
            }
            ServiceEvent::Disconnected | ServiceEvent::PairingFailed(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{find_network, NetworkDescriptor};

    const ACCOUNT: &str = "0x6Be02d1d3665660d22FF9624b7BE0551ee1Ac91b";

    fn connected(chain_id: u64) -> AppState {
        let mut state = AppState::default();
        state.begin_connect();
        state.apply(ServiceEvent::Connected {
            account: ACCOUNT.to_string(),
            chain_id,
            network: find_network(chain_id).map(NetworkDescriptor::from),
        });
        state
    }

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(!state.paired);
        assert!(!state.show_account());
        assert_eq!(state.session, Session::default());
    }

    #[test]
    fn test_supported_chain_shows_name_and_symbol() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::BalanceUpdated("2.5".to_string()));
        state.apply(ServiceEvent::FetchingDone);

        assert!(state.show_account());
        assert!(state.session.supported);
        assert_eq!(state.session.network_name.as_deref(), Some("Moonbase Alpha"));
        assert_eq!(state.session.token_symbol.as_deref(), Some("DEV"));
        assert_eq!(state.session.balance.as_deref(), Some("2.5"));
        assert_eq!(state.session.chain_id, Some(1287));
    }

    #[test]
    fn test_unsupported_chain_suppresses_network() {
        let mut state = connected(1);
        state.apply(ServiceEvent::FetchingDone);

        assert!(!state.session.supported);
        assert_eq!(state.session.account.as_deref(), Some(ACCOUNT));
        assert_eq!(state.session.chain_id, Some(1));
        assert!(state.session.network_name.is_none());
        assert!(state.session.token_symbol.is_none());
        assert!(state.session.balance.is_none());
    }

    #[test]
    fn test_switch_to_unsupported_clears_previous_network() {
        let mut state = connected(1284);
        state.apply(ServiceEvent::BalanceUpdated("1.0".to_string()));
        state.apply(ServiceEvent::Connected {
            account: ACCOUNT.to_string(),
            chain_id: 56,
            network: None,
        });
        assert!(!state.session.supported);
        assert!(state.session.balance.is_none());
        assert!(state.session.network_name.is_none());
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::BalanceUpdated("2.0".to_string()));
        state.apply(ServiceEvent::TransactionFailed("nope".to_string()));
        state.apply(ServiceEvent::Disconnected);

        assert_eq!(state.session, Session::default());
        assert!(!state.paired);
        assert!(state.last_tx_hash.is_none());
    }

    #[test]
    fn test_user_reset_clears_everything() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::FetchingDone);
        state.reset();
        assert_eq!(state.session, Session::default());
        assert!(!state.show_account());
    }

    #[test]
    fn test_failed_send_keeps_session() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::BalanceUpdated("2.0".to_string()));
        state.apply(ServiceEvent::FetchingDone);
        let before = state.session.clone();

        state.begin_send();
        state.apply(ServiceEvent::TransactionFailed(
            "User rejected the transaction".to_string(),
        ));

        assert!(!state.sending);
        assert_eq!(
            state.session.error.as_deref(),
            Some("User rejected the transaction")
        );
        assert_eq!(
            Session {
                error: None,
                ..state.session.clone()
            },
            before
        );
    }

    #[test]
    fn test_begin_send_clears_previous_error() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::TransactionFailed("first".to_string()));
        state.begin_send();
        assert!(state.session.error.is_none());
        state.apply(ServiceEvent::TransactionSent {
            hash: "0xabc".to_string(),
        });
        assert_eq!(state.last_tx_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_pairing_failed_resets_and_shows_error() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::PairingFailed("Session Rejected".to_string()));
        assert!(!state.paired);
        assert_eq!(state.session, Session::default());
        assert_eq!(state.error(), Some("Session Rejected"));

        // Cleared once the user tries again
        state.begin_connect();
        assert!(state.error().is_none());
    }

    #[test]
    fn test_balance_error_keeps_pairing() {
        let mut state = connected(1287);
        state.apply(ServiceEvent::Error("Failed to fetch balance: timeout".to_string()));
        state.apply(ServiceEvent::FetchingDone);
        assert!(state.show_account());
        assert_eq!(state.error(), Some("Failed to fetch balance: timeout"));
        assert_eq!(state.session.account.as_deref(), Some(ACCOUNT));
    }

    #[test]
    fn test_stale_events_after_reset_ignored() {
        let mut state = connected(1287);
        state.reset();
        state.apply(ServiceEvent::BalanceUpdated("9.0".to_string()));
        state.apply(ServiceEvent::FetchingDone);
        assert_eq!(state.session, Session::default());
    }

    #[test]
    fn test_display_uri_builds_qr() {
        let mut state = AppState::default();
        state.begin_connect();
        state.apply(ServiceEvent::DisplayUri("wc:topic@1?bridge=x&key=ab".to_string()));
        assert!(state.pairing_qr.is_some());
        assert!(!state.show_account());
    }
}
