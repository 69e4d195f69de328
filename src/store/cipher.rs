//! At-rest encryption for crawl credentials.
//!
//! Values are sealed with AES-256-GCM under a fresh random nonce and stored
//! as hex of `nonce || ciphertext`. Empty values stay empty.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::app::{GradewatchError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher { .. }")
    }
}

impl CredentialCipher {
    /// Build from a 64-character hex key.
    pub fn from_hex(key: &str) -> Result<Self> {
        let bytes = hex::decode(key.trim())
            .map_err(|e| GradewatchError::Crypto(format!("key is not hex: {}", e)))?;
        if bytes.len() != KEY_LEN {
            return Err(GradewatchError::Crypto(format!(
                "key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// A cipher under a random key, for stores that never outlive the process.
    pub fn ephemeral() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Read the hex key at `path`, creating it with a random key first if
    /// the file does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_hex(&fs::read_to_string(path)?);
        }

        let key = hex::encode(Aes256Gcm::generate_key(OsRng));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &key)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Self::from_hex(&key)
    }

    pub fn encrypt(&self, plain: &str) -> Result<String> {
        if plain.is_empty() {
            return Ok(String::new());
        }
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|_| GradewatchError::Crypto("encryption failed".into()))?;

        let mut out = nonce.to_vec();
        out.extend_from_slice(&sealed);
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        let bytes = hex::decode(stored)
            .map_err(|e| GradewatchError::Crypto(format!("stored value is not hex: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(GradewatchError::Crypto("stored value has no nonce".into()));
        }

        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| GradewatchError::Crypto("decryption failed, wrong key?".into()))?;
        String::from_utf8(plain).map_err(|e| GradewatchError::Crypto(e.to_string()))
    }
}
