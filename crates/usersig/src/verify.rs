//! UserSig verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the envelope decodes and carries `TLS.sig`; other absent fields read
//!    as zero or empty
//! 2. `TLS.sdkappid` equals the verifier's app id
//! 3. `TLS.identifier` equals the expected identity
//! 4. `now <= TLS.time + TLS.expire`
//! 5. the user buffer is present exactly when one is expected, and equal to it
//! 6. the signature matches (constant-time comparison)

use std::sync::Arc;

use usersig_core::{Clock, SecretKey, SystemClock, UserSigConfig};

use crate::document::SigDocument;
use crate::envelope::Envelope;
use crate::error::{MalformedStage, UserBufError, UserSigError};
use crate::userbuf::UserBuf;

/// Verifies UserSig tokens for one application.
pub struct TokenVerifier {
    sdk_app_id: u64,
    key: SecretKey,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Create a verifier that reads the system clock for
    /// [`verify_user_sig_now`](Self::verify_user_sig_now).
    pub fn new(sdk_app_id: u64, key: impl Into<SecretKey>) -> Self {
        Self {
            sdk_app_id,
            key: key.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a verifier from configuration, resolving the shared key.
    pub fn from_config(config: &UserSigConfig) -> Result<Self, UserSigError> {
        config.validate()?;
        Ok(Self::new(config.sdk_app_id, config.require_key()?))
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Verify a UserSig that carries no user buffer, as of `now`.
    pub fn verify_user_sig(
        &self,
        identifier: &str,
        user_sig: &str,
        now: i64,
    ) -> Result<VerifiedUserSig, UserSigError> {
        self.verify(identifier, user_sig, now, None)
    }

    /// Verify a UserSig that carries no user buffer, as of the clock's now.
    pub fn verify_user_sig_now(
        &self,
        identifier: &str,
        user_sig: &str,
    ) -> Result<VerifiedUserSig, UserSigError> {
        self.verify(identifier, user_sig, self.clock.now(), None)
    }

    /// Verify a UserSig that must carry exactly `user_buf`, as of `now`.
    pub fn verify_user_sig_with_buf(
        &self,
        identifier: &str,
        user_sig: &str,
        now: i64,
        user_buf: &[u8],
    ) -> Result<VerifiedUserSig, UserSigError> {
        self.verify(identifier, user_sig, now, Some(user_buf))
    }

    fn verify(
        &self,
        identifier: &str,
        user_sig: &str,
        now: i64,
        expected_user_buf: Option<&[u8]>,
    ) -> Result<VerifiedUserSig, UserSigError> {
        let result = Envelope::unpack(user_sig)
            .and_then(|document| self.check(document, identifier, now, expected_user_buf));

        match &result {
            Ok(verified) => tracing::debug!(
                identifier = %identifier,
                sdk_app_id = self.sdk_app_id,
                expires_at = verified.expires_at,
                "User sig verified"
            ),
            Err(e @ (UserSigError::SignatureMismatch | UserSigError::UserBufMismatch)) => {
                tracing::warn!(
                    identifier = %identifier,
                    sdk_app_id = self.sdk_app_id,
                    error = %e,
                    "User sig rejected"
                )
            }
            Err(e) => tracing::debug!(
                identifier = %identifier,
                sdk_app_id = self.sdk_app_id,
                error = %e,
                "User sig rejected"
            ),
        }

        result
    }

    fn check(
        &self,
        document: SigDocument,
        identifier: &str,
        now: i64,
        expected_user_buf: Option<&[u8]>,
    ) -> Result<VerifiedUserSig, UserSigError> {
        let Some(sig) = document.sig.as_deref() else {
            return Err(UserSigError::malformed(
                MalformedStage::MissingField,
                "TLS.sig is required",
            ));
        };

        if document.sdk_app_id.unwrap_or_default() != self.sdk_app_id {
            return Err(UserSigError::SdkAppIdMismatch {
                expected: self.sdk_app_id,
                actual: document.sdk_app_id,
            });
        }

        if document.identifier.as_deref().unwrap_or_default() != identifier {
            return Err(UserSigError::IdentifierMismatch {
                expected: identifier.to_string(),
                actual: document.identifier.clone(),
            });
        }

        let time = document.issued_at();
        let expire = document.lifetime();
        let expires_at = time.saturating_add(expire);
        if now > expires_at {
            return Err(UserSigError::Expired {
                expired_at: expires_at,
                current_time: now,
            });
        }

        match (expected_user_buf, document.user_buf.as_deref()) {
            (Some(expected), Some(actual)) => {
                if expected != actual {
                    return Err(UserSigError::UserBufMismatch);
                }
            }
            (None, None) => {}
            (expected, actual) => {
                return Err(UserSigError::UserBufTypeMismatch {
                    expected_present: expected.is_some(),
                    actual_present: actual.is_some(),
                });
            }
        }

        if !document.sig_fields().verify(&self.key, sig) {
            return Err(UserSigError::SignatureMismatch);
        }

        Ok(VerifiedUserSig {
            identifier: identifier.to_string(),
            sdk_app_id: self.sdk_app_id,
            issued_at: time,
            expire,
            expires_at,
            user_buf: document.user_buf,
        })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("sdk_app_id", &self.sdk_app_id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// A UserSig that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUserSig {
    pub identifier: String,
    pub sdk_app_id: u64,
    /// `TLS.time`
    pub issued_at: i64,
    /// `TLS.expire`
    pub expire: i64,
    /// `TLS.time + TLS.expire`
    pub expires_at: i64,
    pub user_buf: Option<Vec<u8>>,
}

impl VerifiedUserSig {
    /// Whether the token is a PrivateMapKey or otherwise carries a user buffer.
    pub fn has_user_buf(&self) -> bool {
        self.user_buf.is_some()
    }

    /// Decode the user buffer as a PrivateMapKey descriptor.
    pub fn private_map_key(&self) -> Option<Result<UserBuf, UserBufError>> {
        self.user_buf.as_deref().map(UserBuf::decode)
    }

    /// Seconds of validity left at `now`.
    pub fn remaining(&self, now: i64) -> i64 {
        self.expires_at.saturating_sub(now)
    }
}
