// torpedo_protocol — wire protocol for battleship session communication.
//
// This crate defines the message types, text command format, and framing used
// by the session server (`torpedo_server`) and game clients to communicate
// over TCP. It is shared between both sides and has no dependency on the
// server's game logic.
//
// Module overview:
// - `types.rs`:    Core ID types — `PlayerSlot`, `ConnectionId`.
// - `message.rs`:  Client-to-server and server-to-client message enums, the
//                  text command encoding, and the ship-layout payload structs
//                  (`ShipSpec`, `CellSpec`).
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then a UTF-8 command.
//
// Design decisions:
// - **Text commands.** The wire vocabulary is plain UTF-8 strings
//   (`FIRE_5_5`, `PlayerID:1`, ...) for compatibility with existing clients.
//   Only the ship-placement payload is JSON, embedded after the
//   `SHIPSPLACED_` prefix with the field names those clients already send.
// - **Tagged enums at the boundary.** Raw text is converted to
//   `ClientMessage` / `ServerMessage` at the transport edge; nothing past the
//   boundary matches on strings.
// - **No async runtime.** Framing works on blocking `std::io` streams and
//   buffered wrappers alike.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{CellSpec, ClientMessage, CommandError, ServerMessage, ShipSpec};
pub use types::{ConnectionId, PlayerSlot};
