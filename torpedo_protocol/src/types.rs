// Core ID types for the session protocol.
//
// These are lightweight types used by both `message.rs` (protocol messages)
// and the server's session management (`torpedo_server::session`). A
// `PlayerSlot` is a match-scoped identity — exactly two exist and they are
// recycled across connections. A `ConnectionId` identifies one TCP
// connection for its lifetime and is never reused for routing decisions
// after the connection closes.

use std::fmt;

/// One of the two fixed player identities in a match. Connections that could
/// not acquire a slot are spectators and carry no `PlayerSlot` at all
/// (`Option<PlayerSlot>` with `None`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    /// The other slot — the opponent of `self`.
    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    /// Wire representation: 1 or 2. Spectators are encoded as -1 by the
    /// message layer, not here.
    pub fn number(self) -> i32 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }

    /// Parse a wire slot number. Anything other than 1 or 2 is not a slot.
    pub fn from_number(n: i32) -> Option<PlayerSlot> {
        match n {
            1 => Some(PlayerSlot::One),
            2 => Some(PlayerSlot::Two),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Server-assigned connection ID (monotonic counter, never recycled).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
