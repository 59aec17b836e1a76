//! Room privilege bitmap carried in a PrivateMapKey.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Privilege bitmap for a single room.
///
/// Only the low eight bits have a meaning. The upper 24 bits are reserved and
/// carried through to the wire unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privileges(u32);

impl Privileges {
    /// No privileges.
    pub const NONE: Self = Self(0);
    /// Create the room.
    pub const CREATE_ROOM: Self = Self(1);
    /// Enter the room.
    pub const JOIN_ROOM: Self = Self(1 << 1);
    /// Send audio.
    pub const SEND_AUDIO: Self = Self(1 << 2);
    /// Receive audio.
    pub const RECV_AUDIO: Self = Self(1 << 3);
    /// Send video.
    pub const SEND_VIDEO: Self = Self(1 << 4);
    /// Receive video.
    pub const RECV_VIDEO: Self = Self(1 << 5);
    /// Send substream video (screen sharing).
    pub const SEND_SUBSTREAM: Self = Self(1 << 6);
    /// Receive substream video (screen sharing).
    pub const RECV_SUBSTREAM: Self = Self(1 << 7);
    /// Every defined privilege (255).
    pub const ALL: Self = Self(0xFF);

    const NAMED: [(Self, &'static str); 8] = [
        (Self::CREATE_ROOM, "create_room"),
        (Self::JOIN_ROOM, "join_room"),
        (Self::SEND_AUDIO, "send_audio"),
        (Self::RECV_AUDIO, "recv_audio"),
        (Self::SEND_VIDEO, "send_video"),
        (Self::RECV_VIDEO, "recv_video"),
        (Self::SEND_SUBSTREAM, "send_substream"),
        (Self::RECV_SUBSTREAM, "recv_substream"),
    ];

    /// Build from raw bits, keeping reserved bits as given.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits as written to the wire.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any reserved (upper 24) bit is set.
    pub const fn has_reserved_bits(self) -> bool {
        self.0 & !Self::ALL.0 != 0
    }

    /// Names of the defined privileges that are set, lowest bit first.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl From<u32> for Privileges {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<Privileges> for u32 {
    fn from(privileges: Privileges) -> Self {
        privileges.0
    }
}

impl BitOr for Privileges {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Privileges {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
