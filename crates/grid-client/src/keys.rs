//! Key loading and signing.
//!
//! The operator's user key is a long-lived ed25519 keypair loaded from
//! an environment variable or file as a base58 string. Both the common
//! 64-byte keypair export (seed followed by public key) and a bare
//! 32-byte seed are accepted. Key material is wiped from intermediate
//! buffers after parsing and never logged; logs carry only a short
//! public-key fingerprint.

use std::fmt;
use std::path::PathBuf;

use ed25519_dalek::{Signature, Signer, SigningKey, SECRET_KEY_LENGTH};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("environment variable {0} is not set")]
    EnvVarNotFound(String),

    #[error("failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key is not valid base58: {0}")]
    Base58Decode(#[from] bs58::decode::Error),

    #[error("decoded key must be 32 or 64 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Where the user signing key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Base58 key material in an environment variable.
    EnvVar { var_name: String },
    /// Base58 key material in a file.
    File { path: PathBuf },
}

/// Holds the user signing key and exposes signing without ever exposing
/// the secret bytes.
pub struct KeyManager {
    signing_key: SigningKey,
}

impl KeyManager {
    pub fn load(source: &KeySource) -> Result<Self, KeyError> {
        let encoded = match source {
            KeySource::EnvVar { var_name } => Zeroizing::new(
                std::env::var(var_name)
                    .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            ),
            KeySource::File { path } => Zeroizing::new(
                std::fs::read_to_string(path)
                    .map_err(|source| KeyError::Io {
                        path: path.clone(),
                        source,
                    })?
                    .trim()
                    .to_string(),
            ),
        };
        Self::from_base58(&encoded)
    }

    /// Parse a base58-encoded key. 64-byte input is treated as a full
    /// keypair export with the seed in the first half.
    pub fn from_base58(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(bs58::decode(encoded.trim()).into_vec()?);

        let seed: [u8; SECRET_KEY_LENGTH] = match decoded.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(&decoded);
                seed
            }
            64 => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(&decoded[..SECRET_KEY_LENGTH]);
                seed
            }
            other => return Err(KeyError::InvalidKeyLength(other)),
        };

        let signing_key = SigningKey::from_bytes(&seed);
        Ok(Self { signing_key })
    }

    #[must_use]
    pub fn pubkey_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Short public-key prefix, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.pubkey_bytes()[..4])
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("pubkey", &self.fingerprint())
            .finish()
    }
}
