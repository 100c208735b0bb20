// torpedo_server — two-player battleship session server.
//
// The server accepts TCP connections, hands the first two connecting clients
// the fixed player slots 1 and 2 (everyone else spectates), synchronizes a
// ship-placement phase, then arbitrates alternating firing turns until one
// fleet is fully destroyed.
//
// Module overview:
// - `game.rs`:     Pure fleet state — cells, ships, shot resolution. No
//                  transport or session concerns.
// - `session.rs`:  Session state — slot pool, connection roster, placement
//                  barrier, firing arbiter, notification fan-out. The core
//                  data structure that `server.rs` drives.
// - `server.rs`:   TCP listener, reader threads (one per client), writer
//                  threads (one per client, draining a bounded outbound
//                  queue), and the main event loop. Uses `std::net` with a
//                  thread-per-connection architecture and an `mpsc` channel
//                  to funnel events into the single-threaded `Session`.
// - `client.rs`:   `NetClient`, a blocking TCP client used by integration
//                  tests and embedders.
//
// Dependencies: `torpedo_protocol` (shared message types and framing).
//
// The server can run as a standalone binary (`main.rs`) or be embedded in
// another process via the library API (`start_server`).

pub mod client;
pub mod game;
pub mod server;
pub mod session;

pub use server::start_server;
