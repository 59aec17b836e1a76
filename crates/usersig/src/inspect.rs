//! Token inspection without verification.

use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::UserSigError;
use crate::userbuf::UserBuf;

/// Information about a token (for inspection).
///
/// Nothing here is authenticated. Use it for debugging and support tooling,
/// never for access decisions.
#[derive(Debug, Clone, Serialize)]
pub struct UserSigInfo {
    pub version: Option<String>,
    pub identifier: Option<String>,
    pub sdk_app_id: Option<u64>,
    pub issued_at: Option<i64>,
    pub expire: Option<i64>,
    /// `issued_at + expire`, absent values read as zero.
    pub expires_at: i64,
    /// Size of the user buffer in bytes, if one is present.
    pub user_buf_len: Option<usize>,
    /// The user buffer decoded as a PrivateMapKey, when it parses as one.
    pub private_map_key: Option<UserBuf>,
    pub has_signature: bool,
}

/// Inspect a token without verification (for debugging).
pub fn inspect_user_sig_unverified(user_sig: &str) -> Result<UserSigInfo, UserSigError> {
    let document = Envelope::unpack(user_sig)?;
    let expires_at = document.expires_at();
    let private_map_key = document
        .user_buf
        .as_deref()
        .and_then(|buf| UserBuf::decode(buf).ok());

    Ok(UserSigInfo {
        version: document.version,
        identifier: document.identifier,
        sdk_app_id: document.sdk_app_id,
        issued_at: document.time,
        expire: document.expire,
        expires_at,
        user_buf_len: document.user_buf.as_ref().map(Vec::len),
        private_map_key,
        has_signature: document.sig.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::TokenIssuer;
    use crate::userbuf::Room;
    use usersig_core::{FixedClock, Privileges};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(1_400_000_000, "secret").with_clock(FixedClock(1_700_000_000))
    }

    #[test]
    fn test_inspect_user_sig() {
        let token = issuer().gen_user_sig("alice", 86400).unwrap();
        let info = inspect_user_sig_unverified(&token).unwrap();

        assert_eq!(info.version.as_deref(), Some("2.0"));
        assert_eq!(info.identifier.as_deref(), Some("alice"));
        assert_eq!(info.expires_at, 1_700_086_400);
        assert_eq!(info.user_buf_len, None);
        assert!(info.private_map_key.is_none());
        assert!(info.has_signature);
    }

    #[test]
    fn test_inspect_private_map_key() {
        let token = issuer()
            .gen_private_map_key("alice", 60, 99, Privileges::JOIN_ROOM)
            .unwrap();
        let info = inspect_user_sig_unverified(&token).unwrap();
        let descriptor = info.private_map_key.unwrap();
        assert_eq!(descriptor.room, Room::Id(99));
        assert_eq!(descriptor.privileges, Privileges::JOIN_ROOM);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["room"]["id"], 99);
        assert_eq!(json["privileges"], 2);
    }

    #[test]
    fn test_inspect_opaque_user_buf() {
        let token = issuer().gen_user_sig_with_buf("alice", 60, b"opaque").unwrap();
        let info = inspect_user_sig_unverified(&token).unwrap();
        assert_eq!(info.user_buf_len, Some(6));
        assert!(info.private_map_key.is_none());
    }

    #[test]
    fn test_inspect_garbage() {
        assert!(inspect_user_sig_unverified("@@@").unwrap_err().is_malformed());
    }
}
