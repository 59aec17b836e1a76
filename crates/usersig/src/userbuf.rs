//! UserBuf: the binary permission descriptor carried by a PrivateMapKey.
//!
//! Layout (all integers big-endian):
//!
//! | size | field |
//! |------|-------|
//! | 1    | version: 0 numeric room, 1 string room |
//! | 2    | identifier length |
//! | n    | identifier |
//! | 4    | sdkappid (low 32 bits) |
//! | 4    | numeric room id, 0 for the string variant |
//! | 4    | absolute expiry (now + duration, low 32 bits) |
//! | 4    | privilege bitmap |
//! | 4    | account type |
//! | 2    | room string length (version 1 only) |
//! | m    | room string (version 1 only) |

use serde::Serialize;
use usersig_core::{Clock, Privileges};

use crate::error::UserBufError;

/// Version byte for a numeric room id.
pub const VERSION_NUMERIC_ROOM: u8 = 0;
/// Version byte for a string room id.
pub const VERSION_STRING_ROOM: u8 = 1;

/// Size of the five fixed 32-bit fields.
const FIXED_FIELDS_LEN: usize = 4 * 5;

/// The room a PrivateMapKey grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    /// Numeric room id.
    Id(u32),
    /// String room id.
    Name(String),
}

impl Room {
    fn name(&self) -> Option<&str> {
        match self {
            Room::Name(name) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A decoded permission descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBuf {
    /// Identity the descriptor is bound to.
    pub identifier: String,
    /// Application id, truncated to 32 bits.
    pub sdk_app_id: u32,
    /// Room the privileges apply to.
    pub room: Room,
    /// Absolute expiry (Unix timestamp, low 32 bits).
    pub expire_at: u32,
    /// Privilege bitmap.
    pub privileges: Privileges,
    /// Account classification, normally 0.
    pub account_type: u32,
}

impl UserBuf {
    /// Build a descriptor that expires `expire` seconds after `clock.now()`.
    ///
    /// The app id and the absolute expiry wrap to 32 bits.
    pub fn new(
        identifier: impl Into<String>,
        sdk_app_id: u64,
        room: Room,
        expire: i64,
        privileges: Privileges,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            sdk_app_id: sdk_app_id as u32,
            room,
            expire_at: clock.now().wrapping_add(expire) as u32,
            privileges,
            account_type: 0,
        }
    }

    /// Set the account type field.
    pub fn with_account_type(mut self, account_type: u32) -> Self {
        self.account_type = account_type;
        self
    }

    /// Format version byte this descriptor encodes with.
    pub fn version(&self) -> u8 {
        if self.room.name().is_some() {
            VERSION_STRING_ROOM
        } else {
            VERSION_NUMERIC_ROOM
        }
    }

    /// Exact size of the encoded record.
    pub fn encoded_len(&self) -> usize {
        let room_len = self.room.name().map_or(0, |name| 2 + name.len());
        1 + 2 + self.identifier.len() + FIXED_FIELDS_LEN + room_len
    }

    /// Encode to the binary record.
    ///
    /// Fails when the identifier or room name does not fit a 16-bit length
    /// prefix rather than writing a truncated length.
    pub fn encode(&self) -> Result<Vec<u8>, UserBufError> {
        let identifier_len = length_prefix("identifier", &self.identifier)?;
        let room_id = match &self.room {
            Room::Id(id) => *id,
            Room::Name(_) => 0,
        };

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.version());
        buf.extend_from_slice(&identifier_len.to_be_bytes());
        buf.extend_from_slice(self.identifier.as_bytes());
        buf.extend_from_slice(&self.sdk_app_id.to_be_bytes());
        buf.extend_from_slice(&room_id.to_be_bytes());
        buf.extend_from_slice(&self.expire_at.to_be_bytes());
        buf.extend_from_slice(&self.privileges.bits().to_be_bytes());
        buf.extend_from_slice(&self.account_type.to_be_bytes());

        if let Some(name) = self.room.name() {
            let name_len = length_prefix("room name", name)?;
            buf.extend_from_slice(&name_len.to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
        }

        debug_assert_eq!(buf.len(), self.encoded_len());
        Ok(buf)
    }

    /// Decode a binary record.
    pub fn decode(bytes: &[u8]) -> Result<Self, UserBufError> {
        let mut reader = Reader::new(bytes);

        let version = reader.u8()?;
        if version != VERSION_NUMERIC_ROOM && version != VERSION_STRING_ROOM {
            return Err(UserBufError::UnsupportedVersion(version));
        }

        let identifier = reader.string("identifier")?;
        let sdk_app_id = reader.u32()?;
        let room_id = reader.u32()?;
        let expire_at = reader.u32()?;
        let privileges = Privileges::from_bits(reader.u32()?);
        let account_type = reader.u32()?;

        let room = if version == VERSION_STRING_ROOM {
            Room::Name(reader.string("room name")?)
        } else {
            Room::Id(room_id)
        };

        let remaining = reader.remaining();
        if remaining != 0 {
            return Err(UserBufError::TrailingBytes(remaining));
        }

        Ok(Self {
            identifier,
            sdk_app_id,
            room,
            expire_at,
            privileges,
            account_type,
        })
    }
}

fn length_prefix(field: &'static str, value: &str) -> Result<u16, UserBufError> {
    u16::try_from(value.len()).map_err(|_| UserBufError::FieldTooLong {
        field,
        len: value.len(),
    })
}

/// Cursor over an encoded record.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], UserBufError> {
        if self.remaining() < needed {
            return Err(UserBufError::Truncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, UserBufError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, UserBufError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, UserBufError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, field: &'static str) -> Result<String, UserBufError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| UserBufError::InvalidUtf8(field))
    }
}
