//! Canonical message construction and HMAC-SHA256 signing.
//!
//! The signed message is a fixed sequence of `tag:value\n` lines. Issuer and
//! verifier must produce it byte for byte, so the tags, their order and the
//! decimal/base64 renderings below are part of the token format:
//!
//! ```text
//! TLS.identifier:{identifier}
//! TLS.sdkappid:{sdkappid}
//! TLS.time:{time}
//! TLS.expire:{expire}
//! TLS.userbuf:{base64(userbuf)}     <- only when a user buffer is present
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use usersig_core::SecretKey;

type HmacSha256 = Hmac<Sha256>;

const TAG_IDENTIFIER: &[u8] = b"TLS.identifier:";
const TAG_SDK_APP_ID: &[u8] = b"TLS.sdkappid:";
const TAG_TIME: &[u8] = b"TLS.time:";
const TAG_EXPIRE: &[u8] = b"TLS.expire:";
const TAG_USER_BUF: &[u8] = b"TLS.userbuf:";
const LINE_END: &[u8] = b"\n";

/// The token fields covered by the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigFields<'a> {
    pub identifier: &'a str,
    pub sdk_app_id: u64,
    /// Issue time (Unix seconds).
    pub time: i64,
    /// Lifetime in seconds.
    pub expire: i64,
    pub user_buf: Option<&'a [u8]>,
}

impl SigFields<'_> {
    /// Build the canonical message.
    pub fn canonical_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(96 + self.identifier.len());
        self.write_canonical(|part| message.extend_from_slice(part));
        message
    }

    fn write_canonical(&self, mut write: impl FnMut(&[u8])) {
        write(TAG_IDENTIFIER);
        write(self.identifier.as_bytes());
        write(LINE_END);
        write(TAG_SDK_APP_ID);
        write(self.sdk_app_id.to_string().as_bytes());
        write(LINE_END);
        write(TAG_TIME);
        write(self.time.to_string().as_bytes());
        write(LINE_END);
        write(TAG_EXPIRE);
        write(self.expire.to_string().as_bytes());
        write(LINE_END);
        if let Some(user_buf) = self.user_buf {
            write(TAG_USER_BUF);
            write(STANDARD.encode(user_buf).as_bytes());
            write(LINE_END);
        }
    }

    /// Compute the HMAC-SHA256 signature.
    pub fn sign(&self, key: &SecretKey) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .expect("HMAC accepts keys of any length");
        self.write_canonical(|part| mac.update(part));
        mac.finalize().into_bytes().to_vec()
    }

    /// Check `signature` against a fresh signature in constant time.
    pub fn verify(&self, key: &SecretKey, signature: &[u8]) -> bool {
        let expected = self.sign(key);
        expected.as_slice().ct_eq(signature).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(user_buf: Option<&[u8]>) -> SigFields<'_> {
        SigFields {
            identifier: "alice",
            sdk_app_id: 1_400_000_000,
            time: 1_700_000_000,
            expire: 86400,
            user_buf,
        }
    }

    #[test]
    fn test_canonical_message_without_user_buf() {
        let message = fields(None).canonical_message();
        assert_eq!(
            String::from_utf8(message).unwrap(),
            "TLS.identifier:alice\n\
             TLS.sdkappid:1400000000\n\
             TLS.time:1700000000\n\
             TLS.expire:86400\n"
        );
    }

    #[test]
    fn test_canonical_message_with_user_buf() {
        let message = fields(Some(&[0xfb, 0xff, 0x01])).canonical_message();
        let message = String::from_utf8(message).unwrap();
        // standard alphabet, not the URL-safe one
        assert!(message.ends_with("TLS.expire:86400\nTLS.userbuf:+/8B\n"));
    }

    #[test]
    fn test_empty_user_buf_is_signed() {
        let message = String::from_utf8(fields(Some(&[])).canonical_message()).unwrap();
        assert!(message.ends_with("TLS.userbuf:\n"));

        let key = SecretKey::from("secret");
        assert_ne!(fields(Some(&[])).sign(&key), fields(None).sign(&key));
    }

    #[test]
    fn test_negative_values_render_in_decimal() {
        let f = SigFields {
            expire: -5,
            ..fields(None)
        };
        let message = String::from_utf8(f.canonical_message()).unwrap();
        assert!(message.contains("TLS.expire:-5\n"));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = SecretKey::from("secret");
        let first = fields(Some(b"buf")).sign(&key);
        let second = fields(Some(b"buf")).sign(&key);
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn test_sign_matches_plain_hmac_over_message() {
        let key = SecretKey::from("secret");
        let f = fields(Some(b"buf"));

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(&f.canonical_message());
        assert_eq!(f.sign(&key), mac.finalize().into_bytes().to_vec());
    }

    #[test]
    fn test_verify() {
        let key = SecretKey::from("secret");
        let f = fields(None);
        let mut sig = f.sign(&key);
        assert!(f.verify(&key, &sig));
        assert!(!f.verify(&SecretKey::from("other"), &sig));

        sig[31] ^= 1;
        assert!(!f.verify(&key, &sig));
        assert!(!f.verify(&key, &sig[..16]));
        assert!(!f.verify(&key, &[]));
    }
}
