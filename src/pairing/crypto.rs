//! Payload encryption for bridge messages.
//!
//! Every payload published on the bridge is AES-256-CBC (PKCS#7) encrypted
//! with the symmetric key shared through the pairing URI and authenticated
//! with HMAC-SHA256 over `ciphertext || iv`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid key length {0}, expected 32 bytes")]
    KeyLength(usize),

    #[error("Invalid IV length {0}, expected 16 bytes")]
    IvLength(usize),

    #[error("HMAC verification failed")]
    BadHmac,

    #[error("Decryption failed")]
    DecryptionFailed,
}

/// Symmetric session key. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymKey([u8; KEY_LEN]);

impl SymKey {
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s)?;
        let key: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::KeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SymKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymKey(..)")
    }
}

/// Wire form of an encrypted payload. All fields are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionPayload {
    pub data: String,
    pub hmac: String,
    pub iv: String,
}

pub fn encrypt(plaintext: &[u8], key: &SymKey) -> EncryptionPayload {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    encrypt_with_iv(plaintext, key, iv)
}

fn encrypt_with_iv(plaintext: &[u8], key: &SymKey, iv: [u8; IV_LEN]) -> EncryptionPayload {
    let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .expect("key and IV lengths are fixed")
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let tag = sign(key, &ciphertext, &iv);

    EncryptionPayload {
        data: hex::encode(&ciphertext),
        hmac: hex::encode(tag),
        iv: hex::encode(iv),
    }
}

/// Verify the HMAC, then decrypt.
pub fn decrypt(payload: &EncryptionPayload, key: &SymKey) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = hex::decode(&payload.data)?;
    let iv_bytes = hex::decode(&payload.iv)?;
    let tag = hex::decode(&payload.hmac)?;

    let iv: [u8; IV_LEN] = iv_bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::IvLength(iv_bytes.len()))?;

    let mut mac = new_mac(key);
    mac.update(&ciphertext);
    mac.update(&iv);
    mac.verify_slice(&tag).map_err(|_| CryptoError::BadHmac)?;

    Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| CryptoError::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn sign(key: &SymKey, ciphertext: &[u8], iv: &[u8]) -> Vec<u8> {
    let mut mac = new_mac(key);
    mac.update(ciphertext);
    mac.update(iv);
    mac.finalize().into_bytes().to_vec()
}

fn new_mac(key: &SymKey) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAINTEXT: &[u8] =
        br#"{"id":1,"jsonrpc":"2.0","method":"wc_sessionUpdate","params":[{"approved":false}]}"#;

    fn test_key() -> SymKey {
        let mut key = [0u8; KEY_LEN];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        SymKey::from_bytes(key)
    }

    fn test_iv() -> [u8; IV_LEN] {
        let mut iv = [0u8; IV_LEN];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = 16 + i as u8;
        }
        iv
    }

    #[test]
    fn test_known_vector() {
        let payload = encrypt_with_iv(PLAINTEXT, &test_key(), test_iv());
        assert_eq!(
            payload.data,
            "5fd99a471e6c171a0a44da85cd290c693841b463c38173306dd35dd0fe16a8ef\
             f3e3de8c73c659d27361b6f8a0ebaf2e71b0b7fa306b765bd14bb6ca50f4bfca\
             b669b10315bf5eff96036970405aa43216a451f46dfeee10dceacbb881a56d1f"
        );
        assert_eq!(
            payload.hmac,
            "0638db15201b9b6f3610b36c011142c3e0ffe9008b7b7da1f3616a8d28dc2914"
        );
        assert_eq!(payload.iv, "101112131415161718191a1b1c1d1e1f");
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymKey::generate();
        let payload = encrypt(PLAINTEXT, &key);
        assert_eq!(decrypt(&payload, &key).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_tampered_hmac_rejected() {
        let key = test_key();
        let mut payload = encrypt_with_iv(PLAINTEXT, &key, test_iv());
        payload.hmac.replace_range(0..2, "ff");
        assert_eq!(decrypt(&payload, &key), Err(CryptoError::BadHmac));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let payload = encrypt(PLAINTEXT, &test_key());
        assert_eq!(
            decrypt(&payload, &SymKey::generate()),
            Err(CryptoError::BadHmac)
        );
    }

    #[test]
    fn test_key_hex() {
        let key = test_key();
        let parsed = SymKey::from_hex(&key.to_hex()).unwrap();
        assert!(parsed == key);
        assert_eq!(SymKey::from_hex("abcd"), Err(CryptoError::KeyLength(2)));
        assert!(format!("{:?}", key).contains(".."));
    }
}
