//! Supported networks.
//!
//! A chain is "supported" when its ID appears in this table. The table gives
//! the display name, native currency symbol and the public RPC endpoint used
//! for balance queries.

use serde::{Deserialize, Serialize};

/// Display metadata and RPC endpoint for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub native_currency_symbol: String,
    pub rpc_url: String,
}

/// Static entry, borrowed form of [`NetworkDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticNetwork {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_currency_symbol: &'static str,
    pub rpc_url: &'static str,
}

impl From<&StaticNetwork> for NetworkDescriptor {
    fn from(n: &StaticNetwork) -> Self {
        Self {
            chain_id: n.chain_id,
            name: n.name.to_string(),
            native_currency_symbol: n.native_currency_symbol.to_string(),
            rpc_url: n.rpc_url.to_string(),
        }
    }
}

pub const SUPPORTED_NETWORKS: &[StaticNetwork] = &[
    StaticNetwork {
        chain_id: 1284,
        name: "Moonbeam",
        native_currency_symbol: "GLMR",
        rpc_url: "https://rpc.api.moonbeam.network",
    },
    StaticNetwork {
        chain_id: 1285,
        name: "Moonriver",
        native_currency_symbol: "MOVR",
        rpc_url: "https://rpc.api.moonriver.moonbeam.network",
    },
    StaticNetwork {
        chain_id: 1287,
        name: "Moonbase Alpha",
        native_currency_symbol: "DEV",
        rpc_url: "https://rpc.api.moonbase.moonbeam.network",
    },
    StaticNetwork {
        chain_id: 1281,
        name: "Moonbeam Development Node",
        native_currency_symbol: "DEV",
        rpc_url: "http://127.0.0.1:9944",
    },
];

/// Look up a built-in network by chain ID. First match wins.
pub fn find_network(chain_id: u64) -> Option<&'static StaticNetwork> {
    SUPPORTED_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Built-in networks plus any extra networks from the config file.
#[derive(Debug, Clone, Default)]
pub struct NetworkTable {
    extra: Vec<NetworkDescriptor>,
}

impl NetworkTable {
    pub fn new(extra: Vec<NetworkDescriptor>) -> Self {
        Self { extra }
    }

    /// Resolve a chain ID. Built-in entries shadow configured ones.
    pub fn lookup(&self, chain_id: u64) -> Option<NetworkDescriptor> {
        if let Some(n) = find_network(chain_id) {
            return Some(n.into());
        }
        self.extra.iter().find(|n| n.chain_id == chain_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_chain() {
        let n = find_network(1287).unwrap();
        assert_eq!(n.name, "Moonbase Alpha");
        assert_eq!(n.native_currency_symbol, "DEV");
    }

    #[test]
    fn test_unknown_chain() {
        assert!(find_network(1).is_none());
        assert!(NetworkTable::default().lookup(1).is_none());
    }

    #[test]
    fn test_chain_ids_unique() {
        for (i, a) in SUPPORTED_NETWORKS.iter().enumerate() {
            for b in &SUPPORTED_NETWORKS[i + 1..] {
                assert_ne!(a.chain_id, b.chain_id);
            }
        }
    }

    #[test]
    fn test_extra_networks() {
        let table = NetworkTable::new(vec![
            NetworkDescriptor {
                chain_id: 1284,
                name: "Shadowed".to_string(),
                native_currency_symbol: "X".to_string(),
                rpc_url: "http://localhost:1".to_string(),
            },
            NetworkDescriptor {
                chain_id: 31337,
                name: "Local".to_string(),
                native_currency_symbol: "ETH".to_string(),
                rpc_url: "http://localhost:8545".to_string(),
            },
        ]);

        assert_eq!(table.lookup(1284).unwrap().name, "Moonbeam");
        assert_eq!(table.lookup(31337).unwrap().native_currency_symbol, "ETH");
        assert!(table.lookup(5).is_none());
    }
}
