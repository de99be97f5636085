//! Pairing URI: `wc:{topic}@{version}?bridge={url}&key={hex}`.
//!
//! The URI is what the QR code carries. It hands the wallet the handshake
//! topic, the bridge to connect to, and the symmetric key.

use std::fmt;

use url::form_urlencoded;

use super::crypto::{CryptoError, SymKey};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcUri {
    pub handshake_topic: String,
    pub version: u32,
    pub bridge: String,
    pub key: SymKey,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UriError {
    #[error("URI must start with 'wc:'")]
    MissingScheme,

    #[error("Malformed URI: {0}")]
    Malformed(String),

    #[error("Missing query parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid key: {0}")]
    Key(#[from] CryptoError),
}

impl WcUri {
    pub fn new(handshake_topic: String, bridge: String, key: SymKey) -> Self {
        Self {
            handshake_topic,
            version: PROTOCOL_VERSION,
            bridge,
            key,
        }
    }

    pub fn parse(s: &str) -> Result<Self, UriError> {
        let rest = s.strip_prefix("wc:").ok_or(UriError::MissingScheme)?;
        let (path, query) = rest
            .split_once('?')
            .ok_or_else(|| UriError::Malformed("no query string".to_string()))?;
        let (topic, version) = path
            .split_once('@')
            .ok_or_else(|| UriError::Malformed("no version".to_string()))?;
        if topic.is_empty() {
            return Err(UriError::Malformed("empty topic".to_string()));
        }
        let version: u32 = version
            .parse()
            .map_err(|_| UriError::Malformed(format!("bad version '{}'", version)))?;

        let mut bridge = None;
        let mut key = None;
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            match k.as_ref() {
                "bridge" => bridge = Some(v.into_owned()),
                "key" => key = Some(v.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            handshake_topic: topic.to_string(),
            version,
            bridge: bridge.ok_or(UriError::MissingParam("bridge"))?,
            key: SymKey::from_hex(&key.ok_or(UriError::MissingParam("key"))?)?,
        })
    }
}

impl fmt::Display for WcUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bridge: String = form_urlencoded::byte_serialize(self.bridge.as_bytes()).collect();
        write!(
            f,
            "wc:{}@{}?bridge={}&key={}",
            self.handshake_topic,
            self.version,
            bridge,
            self.key.to_hex()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SymKey {
        SymKey::from_bytes([0xab; 32])
    }

    #[test]
    fn test_format() {
        let uri = WcUri::new(
            "8a5e5bdc-a0e4-4702-ba63-8f1a5655744f".to_string(),
            "https://bridge.walletconnect.org".to_string(),
            key(),
        );
        assert_eq!(
            uri.to_string(),
            format!(
                "wc:8a5e5bdc-a0e4-4702-ba63-8f1a5655744f@1?bridge=https%3A%2F%2Fbridge.walletconnect.org&key={}",
                "ab".repeat(32)
            )
        );
    }

    #[test]
    fn test_parse_formatted() {
        let uri = WcUri::new(
            "topic".to_string(),
            "https://bridge.example.org".to_string(),
            key(),
        );
        assert_eq!(WcUri::parse(&uri.to_string()).unwrap(), uri);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(WcUri::parse("http://x"), Err(UriError::MissingScheme));
        assert!(matches!(
            WcUri::parse("wc:topic@1"),
            Err(UriError::Malformed(_))
        ));
        assert_eq!(
            WcUri::parse(&format!("wc:topic@1?key={}", "ab".repeat(32))),
            Err(UriError::MissingParam("bridge"))
        );
        assert!(matches!(
            WcUri::parse("wc:topic@1?bridge=x&key=zz"),
            Err(UriError::Key(CryptoError::Hex(_)))
        ));
    }
}
