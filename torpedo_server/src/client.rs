// TCP client for connecting to the session server.
//
// Provides a non-blocking interface for a caller's main thread:
// - `connect()` performs the TCP connect and reads the `PlayerID:<n>` slot
//   assignment on the calling thread, then spawns a background reader thread.
// - The reader thread calls `read_message()` in a loop, parses
//   `ServerMessage`, and pushes into an `mpsc` channel.
// - The calling thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking; `recv_timeout()` waits for the
//   next message with a deadline (used heavily by integration tests).
//
// This separation ensures the caller never blocks on network reads. Writes
// flush synchronously, which is acceptable for the small commands we send.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, bail};
use torpedo_protocol::framing::{read_message, write_message};
use torpedo_protocol::message::{ClientMessage, ServerMessage, ShipSpec};
use torpedo_protocol::types::PlayerSlot;

/// TCP client for session server communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    slot: Option<PlayerSlot>,
}

impl NetClient {
    /// Connect to a session server and read the slot assignment. Returns the
    /// client; `slot()` tells the caller whether it plays or spectates.
    pub fn connect(addr: SocketAddr) -> anyhow::Result<NetClient> {
        let stream = TcpStream::connect(addr).context("connect failed")?;

        // Set a read timeout for the assignment message.
        stream.set_read_timeout(Some(Duration::from_secs(5))).ok();

        let reader_stream = stream.try_clone().context("clone failed")?;
        let writer = BufWriter::new(stream);
        let mut reader = BufReader::new(reader_stream);

        let bytes = read_message(&mut reader).context("read assignment failed")?;
        let text = String::from_utf8(bytes).context("assignment not UTF-8")?;
        let slot = match ServerMessage::parse(&text) {
            ServerMessage::PlayerAssigned { slot } => slot,
            other => bail!("expected slot assignment, got {other:?}"),
        };

        // Clear the read timeout for the long-lived reader loop.
        if let Ok(inner) = reader.get_ref().try_clone() {
            inner.set_read_timeout(None).ok();
        }

        // Spawn reader thread.
        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(NetClient {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            slot,
        })
    }

    /// The slot assigned at connect time; `None` means spectator.
    pub fn slot(&self) -> Option<PlayerSlot> {
        self.slot
    }

    /// Submit a fleet layout.
    pub fn place_ships(&mut self, ships: Vec<ShipSpec>) -> anyhow::Result<()> {
        self.send(&ClientMessage::PlaceShips(ships))
    }

    /// Request a shot at (x, y).
    pub fn fire(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.send(&ClientMessage::Fire { x, y })
    }

    /// Send raw command text, bypassing the message encoding. Lets tests
    /// exercise the server's handling of malformed commands.
    pub fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        write_message(&mut self.writer, text.as_bytes()).context("send failed")
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Wait for the next server message, up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.inbox.recv_timeout(timeout).ok()
    }

    fn send(&mut self, msg: &ClientMessage) -> anyhow::Result<()> {
        write_message(&mut self.writer, msg.encode().as_bytes()).context("send failed")
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        let Ok(text) = String::from_utf8(bytes) else {
            break; // Server never sends non-UTF-8.
        };
        if tx.send(ServerMessage::parse(&text)).is_err() {
            break; // Owner dropped the receiver.
        }
    }
}
