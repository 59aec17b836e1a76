//! Shared signing key.

use std::fmt;
use zeroize::Zeroizing;

/// The secret shared between issuer and verifier.
///
/// The key is used as raw HMAC key bytes. It is provisioned out of band and
/// never generated or rotated here.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretKey {
    fn from(key: &str) -> Self {
        Self::new(key.as_bytes())
    }
}

impl From<String> for SecretKey {
    fn from(key: String) -> Self {
        Self::new(key.into_bytes())
    }
}

impl From<&[u8]> for SecretKey {
    fn from(key: &[u8]) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}
