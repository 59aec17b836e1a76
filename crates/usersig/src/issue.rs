//! UserSig and PrivateMapKey issuance.

use std::sync::Arc;

use usersig_core::{Clock, Privileges, SecretKey, SystemClock, UserSigConfig};

use crate::document::SigDocument;
use crate::envelope::Envelope;
use crate::error::UserSigError;
use crate::userbuf::{Room, UserBuf};

/// Issues UserSig tokens for one application.
///
/// # Example
/// ```rust
/// use usersig::{Privileges, TokenIssuer, TokenVerifier};
///
/// let issuer = TokenIssuer::new(1400000000, "shared-secret");
/// let user_sig = issuer.gen_user_sig("alice", 86400).unwrap();
///
/// let verifier = TokenVerifier::new(1400000000, "shared-secret");
/// verifier.verify_user_sig_now("alice", &user_sig).unwrap();
///
/// // Room-scoped key: join the room and receive audio/video only.
/// let key = issuer
///     .gen_private_map_key_with_room_str("alice", 86400, "room42", Privileges::from_bits(42))
///     .unwrap();
/// assert!(!key.is_empty());
/// ```
pub struct TokenIssuer {
    sdk_app_id: u64,
    key: SecretKey,
    clock: Arc<dyn Clock>,
    envelope: Envelope,
    default_expire: i64,
}

impl TokenIssuer {
    /// Create an issuer using the system clock and no compression.
    pub fn new(sdk_app_id: u64, key: impl Into<SecretKey>) -> Self {
        Self {
            sdk_app_id,
            key: key.into(),
            clock: Arc::new(SystemClock),
            envelope: Envelope::default(),
            default_expire: UserSigConfig::new(sdk_app_id).default_expire_seconds,
        }
    }

    /// Create an issuer from configuration, resolving the shared key.
    pub fn from_config(config: &UserSigConfig) -> Result<Self, UserSigError> {
        config.validate()?;
        let key = config.require_key()?;
        Ok(Self {
            sdk_app_id: config.sdk_app_id,
            key,
            clock: Arc::new(SystemClock),
            envelope: Envelope::new(config.compression_level, config.pool_capacity),
            default_expire: config.default_expire_seconds,
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the envelope (compression level and pool size).
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// Application id tokens are issued for.
    pub fn sdk_app_id(&self) -> u64 {
        self.sdk_app_id
    }

    /// Lifetime used by [`gen_default_user_sig`](Self::gen_default_user_sig).
    pub fn default_expire(&self) -> i64 {
        self.default_expire
    }

    /// Issue a UserSig valid for `expire` seconds.
    pub fn gen_user_sig(&self, identifier: &str, expire: i64) -> Result<String, UserSigError> {
        self.gen_sig(identifier, expire, None)
    }

    /// Issue a UserSig with the configured default lifetime.
    pub fn gen_default_user_sig(&self, identifier: &str) -> Result<String, UserSigError> {
        self.gen_sig(identifier, self.default_expire, None)
    }

    /// Issue a UserSig carrying an opaque user buffer.
    pub fn gen_user_sig_with_buf(
        &self,
        identifier: &str,
        expire: i64,
        user_buf: &[u8],
    ) -> Result<String, UserSigError> {
        self.gen_sig(identifier, expire, Some(user_buf.to_vec()))
    }

    /// Issue a PrivateMapKey for a numeric room.
    ///
    /// `privileges` selects what the holder may do in the room, see
    /// [`Privileges`].
    pub fn gen_private_map_key(
        &self,
        identifier: &str,
        expire: i64,
        room_id: u32,
        privileges: Privileges,
    ) -> Result<String, UserSigError> {
        self.gen_private_map_key_for_room(identifier, expire, Room::Id(room_id), privileges, 0)
    }

    /// Issue a PrivateMapKey for a string room.
    pub fn gen_private_map_key_with_room_str(
        &self,
        identifier: &str,
        expire: i64,
        room: &str,
        privileges: Privileges,
    ) -> Result<String, UserSigError> {
        self.gen_private_map_key_for_room(
            identifier,
            expire,
            Room::Name(room.to_string()),
            privileges,
            0,
        )
    }

    /// Issue a PrivateMapKey for any room with an explicit account type.
    pub fn gen_private_map_key_for_room(
        &self,
        identifier: &str,
        expire: i64,
        room: Room,
        privileges: Privileges,
        account_type: u32,
    ) -> Result<String, UserSigError> {
        let user_buf = UserBuf::new(
            identifier,
            self.sdk_app_id,
            room,
            expire,
            privileges,
            self.clock.as_ref(),
        )
        .with_account_type(account_type)
        .encode()?;
        self.gen_sig(identifier, expire, Some(user_buf))
    }

    fn gen_sig(
        &self,
        identifier: &str,
        expire: i64,
        user_buf: Option<Vec<u8>>,
    ) -> Result<String, UserSigError> {
        let mut document = SigDocument::new(
            identifier,
            self.sdk_app_id,
            self.clock.now(),
            expire,
            user_buf,
        );
        document.sig = Some(document.sig_fields().sign(&self.key));

        let user_sig = self.envelope.pack(&document)?;
        tracing::debug!(
            identifier = %identifier,
            sdk_app_id = self.sdk_app_id,
            expire = expire,
            has_user_buf = document.user_buf.is_some(),
            token_len = user_sig.len(),
            "Issued user sig"
        );
        Ok(user_sig)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("sdk_app_id", &self.sdk_app_id)
            .field("key", &self.key)
            .field("envelope", &self.envelope)
            .field("default_expire", &self.default_expire)
            .finish_non_exhaustive()
    }
}
