//! Moonbeam WalletConnect demo.
//!
//! Pairs a mobile wallet over the WalletConnect v1 bridge, shows the
//! connected account, chain, network and balance, and sends a fixed test
//! transaction. The egui front end and the tokio service task talk only
//! through [`events::UiEvent`] and [`events::ServiceEvent`].

pub mod app;
pub mod config;
pub mod events;
pub mod networks;
pub mod pairing;
pub mod rpc_client;
pub mod service;
pub mod session_store;
pub mod state;
pub mod view;
