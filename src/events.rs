//! Event types for communication between UI and service task.
//!
//! These two enums are the *only* interface between the synchronous egui render
//! loop and the asynchronous service task. No shared state, no Arc, no Mutex.

use crate::networks::NetworkDescriptor;

// ============================================================================
// UI → Service
// ============================================================================

/// Commands sent from the UI thread to the background service task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Create a connector and pair (or resume a stored pairing).
    Connect,

    /// Kill the session so it also ends on the mobile device.
    Disconnect,

    /// Send the fixed test transaction from the account to itself.
    SendTransaction,

    /// Clean shutdown.
    Shutdown,
}

// ============================================================================
// Service → UI
// ============================================================================

/// Events sent from the service task back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// New session requested; the wallet must scan this URI.
    DisplayUri(String),

    /// Wallet connected (or switched chain/account). `network` is `None`
    /// when the chain is not in the supported table.
    Connected {
        account: String,
        chain_id: u64,
        network: Option<NetworkDescriptor>,
    },

    /// Formatted native-token balance.
    BalanceUpdated(String),

    /// Connect flow finished, successfully or not.
    FetchingDone,

    /// Session ended without error.
    Disconnected,

    /// Session ended with an error; the message is shown after the reset.
    PairingFailed(String),

    /// Bridge socket state changed.
    BridgeConnected,
    BridgeDisconnected,

    /// Wallet accepted the transaction.
    TransactionSent { hash: String },

    /// Transaction submission failed; message shown verbatim.
    TransactionFailed(String),

    /// Non-fatal error to display in the UI.
    Error(String),
}
