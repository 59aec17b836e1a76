//! The signed token document.

use serde::{Deserialize, Serialize};

use crate::sign::SigFields;

/// Format version written to `TLS.ver`.
pub const SIG_VERSION: &str = "2.0";

/// The JSON document inside a UserSig envelope.
///
/// Every field tracks its own presence. Absent fields are left out of the
/// JSON entirely and read back as zero or empty. A present user buffer is
/// kept even when it is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigDocument {
    #[serde(rename = "TLS.ver", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "TLS.identifier", default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(rename = "TLS.sdkappid", default, skip_serializing_if = "Option::is_none")]
    pub sdk_app_id: Option<u64>,

    /// Lifetime in seconds, relative to `time`.
    #[serde(rename = "TLS.expire", default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,

    /// Issue time (Unix seconds).
    #[serde(rename = "TLS.time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,

    #[serde(
        rename = "TLS.userbuf",
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub user_buf: Option<Vec<u8>>,

    #[serde(
        rename = "TLS.sig",
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub sig: Option<Vec<u8>>,
}

impl SigDocument {
    /// An unsigned document for the current format version.
    ///
    /// A zero app id, time or lifetime and an empty identifier are left out.
    pub fn new(
        identifier: impl Into<String>,
        sdk_app_id: u64,
        time: i64,
        expire: i64,
        user_buf: Option<Vec<u8>>,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            version: Some(SIG_VERSION.to_string()),
            identifier: (!identifier.is_empty()).then_some(identifier),
            sdk_app_id: (sdk_app_id != 0).then_some(sdk_app_id),
            expire: (expire != 0).then_some(expire),
            time: (time != 0).then_some(time),
            user_buf,
            sig: None,
        }
    }

    /// Fields covered by the signature. Absent values sign as empty or zero.
    pub fn sig_fields(&self) -> SigFields<'_> {
        SigFields {
            identifier: self.identifier.as_deref().unwrap_or_default(),
            sdk_app_id: self.sdk_app_id.unwrap_or_default(),
            time: self.issued_at(),
            expire: self.lifetime(),
            user_buf: self.user_buf.as_deref(),
        }
    }

    /// Issue time, zero when absent.
    pub fn issued_at(&self) -> i64 {
        self.time.unwrap_or_default()
    }

    /// Lifetime in seconds, zero when absent.
    pub fn lifetime(&self) -> i64 {
        self.expire.unwrap_or_default()
    }

    /// Absolute expiry, `time + expire`.
    pub fn expires_at(&self) -> i64 {
        self.issued_at().saturating_add(self.lifetime())
    }
}

/// Standard padded base64 for binary fields inside the JSON document.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}
