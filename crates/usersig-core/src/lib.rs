//! # usersig-core
//!
//! Types shared across the UserSig crates:
//!
//! - [`UserSigConfig`]: issuer/verifier configuration loaded from YAML
//! - [`Clock`]: injected time source used wherever a token reads "now"
//! - [`Privileges`]: the room privilege bitmap carried in a PrivateMapKey
//! - [`SecretKey`]: the shared HMAC key, redacted in `Debug` and zeroized on drop

pub mod clock;
pub mod config;
pub mod key;
pub mod privilege;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, DEFAULT_COMPRESSION_LEVEL, DEFAULT_POOL_CAPACITY, UserSigConfig};
pub use key::SecretKey;
pub use privilege::Privileges;
