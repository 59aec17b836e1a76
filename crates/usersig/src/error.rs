//! Error types for UserSig issuance and verification.

use std::fmt;

use thiserror::Error;
use usersig_core::ConfigError;

/// Stage of envelope decoding that rejected a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedStage {
    /// Outer URL-safe base64 layer.
    Base64,
    /// zlib stream.
    Zlib,
    /// JSON document.
    Json,
    /// A field verification cannot do without is absent.
    MissingField,
}

impl fmt::Display for MalformedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            MalformedStage::Base64 => "base64",
            MalformedStage::Zlib => "zlib",
            MalformedStage::Json => "json",
            MalformedStage::MissingField => "missing field",
        };
        f.write_str(stage)
    }
}

/// Errors from encoding or decoding a UserBuf record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserBufError {
    /// A length-prefixed field does not fit its 16-bit length.
    #[error("{field} is {len} bytes, longer than the {max} byte limit", max = u16::MAX)]
    FieldTooLong { field: &'static str, len: usize },

    /// The record ended before a field was complete.
    #[error("user buffer truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Unknown format version byte.
    #[error("unsupported user buffer version {0}")]
    UnsupportedVersion(u8),

    /// A text field is not UTF-8.
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// Bytes left over after the last field.
    #[error("{0} trailing bytes after user buffer")]
    TrailingBytes(usize),
}

/// Errors that can occur while issuing or verifying a UserSig.
///
/// Every verification failure is terminal: the token must be rejected and a
/// fresh one obtained.
#[derive(Debug, Error)]
pub enum UserSigError {
    // ===== Envelope Errors =====
    /// The token could not be decoded, decompressed or parsed.
    #[error("malformed user sig ({stage}): {reason}")]
    Malformed {
        stage: MalformedStage,
        reason: String,
    },

    // ===== Verification Errors =====
    /// The token was issued for another application.
    #[error("sdkappid mismatch: expected {expected}, {}", match actual {
        Some(a) => format!("got {a}"),
        None => "token carries none".to_string(),
    })]
    SdkAppIdMismatch { expected: u64, actual: Option<u64> },

    /// The token was issued to another identity.
    #[error("identifier mismatch: expected '{expected}', {}", match actual {
        Some(a) => format!("got '{a}'"),
        None => "token carries none".to_string(),
    })]
    IdentifierMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// The validity window has passed.
    #[error("user sig expired at {expired_at}, current time is {current_time}")]
    Expired {
        /// `TLS.time + TLS.expire` (Unix timestamp)
        expired_at: i64,
        /// Time the check was made against (Unix timestamp)
        current_time: i64,
    },

    /// One side carries a user buffer and the other does not.
    #[error("userbuf type mismatch: expected {}, token has {}",
        if *expected_present { "a user buffer" } else { "no user buffer" },
        if *actual_present { "one" } else { "none" })]
    UserBufTypeMismatch {
        expected_present: bool,
        actual_present: bool,
    },

    /// Both sides carry a user buffer but the bytes differ.
    #[error("userbuf mismatch")]
    UserBufMismatch,

    /// The recomputed HMAC does not match `TLS.sig`.
    #[error("signature mismatch")]
    SignatureMismatch,

    // ===== Issuance Errors =====
    /// A UserBuf record could not be built or parsed.
    #[error("user buffer error: {0}")]
    UserBuf(#[from] UserBufError),

    /// The token document could not be serialized.
    #[error("failed to serialize user sig: {reason}")]
    Serialization { reason: String },

    /// The compressor failed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// Issuer or verifier configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl UserSigError {
    pub(crate) fn malformed(stage: MalformedStage, reason: impl Into<String>) -> Self {
        UserSigError::Malformed {
            stage,
            reason: reason.into(),
        }
    }

    /// Check if this error is due to token expiration
    pub fn is_expired(&self) -> bool {
        matches!(self, UserSigError::Expired { .. })
    }

    /// Check if the token could not be decoded at all
    pub fn is_malformed(&self) -> bool {
        matches!(self, UserSigError::Malformed { .. })
    }

    /// Check if this error is a signature/format error
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            UserSigError::SignatureMismatch | UserSigError::Malformed { .. }
        )
    }

    /// Check if the error came from the user buffer comparison
    pub fn is_user_buf_mismatch(&self) -> bool {
        matches!(
            self,
            UserSigError::UserBufTypeMismatch { .. } | UserSigError::UserBufMismatch
        )
    }

    /// Check if this error is a verification rejection rather than an
    /// issuance or configuration failure
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            UserSigError::Malformed { .. }
                | UserSigError::SdkAppIdMismatch { .. }
                | UserSigError::IdentifierMismatch { .. }
                | UserSigError::Expired { .. }
                | UserSigError::UserBufTypeMismatch { .. }
                | UserSigError::UserBufMismatch
                | UserSigError::SignatureMismatch
        )
    }

    /// Get the expiration time if this is an expiration error
    pub fn get_expiration_time(&self) -> Option<i64> {
        match self {
            UserSigError::Expired { expired_at, .. } => Some(*expired_at),
            _ => None,
        }
    }
}
