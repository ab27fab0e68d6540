//! AES-256-GCM envelope.
//!
//! - [`EncryptionService`]: encrypt/decrypt with a raw 32-byte key
//! - [`EncryptedData`]: nonce plus ciphertext
//!
//! Every call to [`EncryptionService::encrypt`] draws a fresh 12-byte
//! nonce, so the same key can seal many payloads.
//!
//! ```rust
//! use panelpost_common::crypto::encryption::EncryptionService;
//!
//! let key = EncryptionService::generate_key();
//! let service = EncryptionService::new(key)?;
//!
//! let plaintext = b"sensitive data";
//! let encrypted = service.encrypt(plaintext)?;
//! let decrypted = service.decrypt(&encrypted)?;
//! assert_eq!(decrypted, plaintext);
//! # Ok::<(), panelpost_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CommonError, CommonResult};

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;
/// Length of a GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Nonce and ciphertext (with appended tag) of one sealed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// AES-GCM encryption service over a raw key.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::validation("key", "Encryption key must be exactly 32 bytes"));
        }

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| {
            CommonError::internal(format!("Failed to create encryption cipher: {e}"))
        })?;

        Ok(Self { key, cipher })
    }

    /// Rebuild a service from a key exported with [`Self::export_key`].
    pub fn from_base64_key(encoded: &str) -> CommonResult<Self> {
        Self::new(BASE64.decode(encoded.trim())?)
    }

    /// Generate a random 32-byte symmetric key.
    #[must_use]
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Raw key as standard base64.
    #[must_use]
    pub fn export_key(&self) -> String {
        BASE64.encode(&self.key)
    }

    /// Encrypt bytes under a fresh nonce.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::internal(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData { nonce: nonce_bytes.to_vec(), ciphertext })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        let nonce_array: [u8; NONCE_LEN] =
            encrypted.nonce.as_slice().try_into().map_err(|_| {
                CommonError::validation("nonce", "Nonce must be exactly 12 bytes for AES-256-GCM")
            })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::internal(format!("Decryption failed: {e}")))
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for crypto::encryption.
    use super::*;

    /// Validates `EncryptionService::new` key length checks.
    ///
    /// Assertions:
    /// - 16-byte keys are rejected; generated keys are 32 bytes.
    #[test]
    fn new_service_rejects_invalid_key_size() {
        assert!(EncryptionService::new(vec![0; 16]).is_err());
        assert_eq!(EncryptionService::generate_key().len(), KEY_LEN);
    }

    /// Validates that each encryption uses its own nonce.
    ///
    /// Assertions:
    /// - Two encryptions of the same plaintext differ in nonce and
    ///   ciphertext.
    /// - Both decrypt to the plaintext.
    #[test]
    fn fresh_nonce_per_encryption() {
        let service = EncryptionService::new(EncryptionService::generate_key()).unwrap();
        let first = service.encrypt(b"session").unwrap();
        let second = service.encrypt(b"session").unwrap();

        assert_eq!(first.nonce.len(), NONCE_LEN);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_eq!(service.decrypt(&first).unwrap(), b"session");
        assert_eq!(service.decrypt(&second).unwrap(), b"session");
    }

    /// Validates decryption under a different key.
    ///
    /// Assertions:
    /// - Decryption fails instead of returning garbage.
    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = EncryptionService::new(EncryptionService::generate_key())
            .unwrap()
            .encrypt(b"secret")
            .unwrap();
        let other = EncryptionService::new(EncryptionService::generate_key()).unwrap();
        assert!(other.decrypt(&sealed).is_err());
    }

    /// Validates key export and re-import.
    ///
    /// Assertions:
    /// - A service rebuilt from the exported key decrypts the payload.
    /// - Truncated nonces are rejected.
    #[test]
    fn exported_key_restores_service() {
        let service = EncryptionService::new(EncryptionService::generate_key()).unwrap();
        let mut sealed = service.encrypt(b"payload").unwrap();

        let restored = EncryptionService::from_base64_key(&service.export_key()).unwrap();
        assert_eq!(restored.decrypt(&sealed).unwrap(), b"payload");

        sealed.nonce.truncate(8);
        assert!(restored.decrypt(&sealed).is_err());
        assert!(EncryptionService::from_base64_key("%%%").is_err());
    }
}
