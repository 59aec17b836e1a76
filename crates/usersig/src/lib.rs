//! # usersig
//!
//! Issues and verifies UserSig tokens: short-lived, HMAC-SHA256 signed
//! credentials binding an identity to an application (`sdkappid`) for a
//! bounded time, optionally restricted to a room and a privilege bitmap
//! (a PrivateMapKey).
//!
//! ## Token Pipeline
//!
//! | Step | Issuance | Verification |
//! |------|----------|--------------|
//! | 1 | encode the [`UserBuf`] descriptor (PrivateMapKey only) | base64 decode |
//! | 2 | sign the canonical message | zlib inflate |
//! | 3 | serialize the JSON [`SigDocument`] | parse JSON |
//! | 4 | zlib compress | compare app id, identity, expiry, user buffer |
//! | 5 | URL-safe base64 | recompute and compare the signature |
//!
//! Time is always read through an injected [`Clock`], so issuance is
//! deterministic under test.

pub mod document;
pub mod envelope;
pub mod error;
pub mod inspect;
pub mod issue;
pub mod pool;
pub mod sign;
pub mod userbuf;
pub mod verify;

pub use document::{SIG_VERSION, SigDocument};
pub use envelope::Envelope;
pub use error::{MalformedStage, UserBufError, UserSigError};
pub use inspect::{UserSigInfo, inspect_user_sig_unverified};
pub use issue::TokenIssuer;
pub use pool::{CompressorPool, PooledCompressor};
pub use sign::SigFields;
pub use userbuf::{Room, UserBuf};
pub use verify::{TokenVerifier, VerifiedUserSig};

// Re-export core types that are needed for public API
pub use usersig_core::{
    Clock, ConfigError, FixedClock, Privileges, SecretKey, SystemClock, UserSigConfig,
};
