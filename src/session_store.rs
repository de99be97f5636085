//! Persisted pairing session.
//!
//! Keeps the last approved session so that pressing Connect after a restart
//! resumes it instead of showing a new QR code.

use sled::Db;
use std::path::Path;
use thiserror::Error;

use crate::pairing::PersistedSession;

const SESSION_KEY: &[u8] = b"walletconnect";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    /// Open or create the session database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SessionStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn save(&self, session: &PersistedSession) -> Result<(), SessionStoreError> {
        let bytes = bincode::serialize(session)?;
        self.db.insert(SESSION_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<PersistedSession>, SessionStoreError> {
        match self.db.get(SESSION_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn clear(&self) -> Result<(), SessionStoreError> {
        self.db.remove(SESSION_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientMeta;

    fn session() -> PersistedSession {
        PersistedSession {
            bridge: "https://bridge.walletconnect.org".to_string(),
            key: "ab".repeat(32),
            client_id: "client".to_string(),
            client_meta: ClientMeta::default(),
            peer_id: "peer".to_string(),
            peer_name: "Wallet".to_string(),
            chain_id: 1287,
            accounts: vec!["0xabc".to_string()],
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("db")).unwrap();

        assert!(store.load().unwrap().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
