//! Storage key generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fmt;

use crate::error::{StorageError, StorageResult};

/// Number of random bytes in a key.
pub const KEY_BYTES: usize = 32;

/// Object key: a random URL-safe token plus a file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build a key from raw random bytes.
    pub fn from_bytes(bytes: &[u8], extension: &str) -> StorageResult<Self> {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty()
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(StorageError::InvalidKey(format!(
                "bad extension: {:?}",
                extension
            )));
        }
        Ok(Self(format!("{}.{}", URL_SAFE_NO_PAD.encode(bytes), extension)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The random token without the extension.
    pub fn token(&self) -> &str {
        self.0.rsplit_once('.').map(|(t, _)| t).unwrap_or(&self.0)
    }

    pub fn extension(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, e)| e).unwrap_or("")
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh storage keys.
pub trait KeySource: Send + Sync {
    /// Generate a never-before-used key with the given extension.
    fn generate(&self, extension: &str) -> StorageResult<StorageKey>;
}

/// [`KeySource`] reading [`KEY_BYTES`] bytes from the OS CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeySource;

impl KeySource for RandomKeySource {
    fn generate(&self, extension: &str) -> StorageResult<StorageKey> {
        let mut bytes = [0u8; KEY_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| StorageError::RandomSource(e.to_string()))?;
        StorageKey::from_bytes(&bytes, extension)
    }
}
