// TCP server and main event loop for the match coordinator.
//
// Architecture: thread-per-connection with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): call `framing::read_message()` in a
//   loop, parse the command text, and send `InternalEvent::CommandFrom` to
//   the main thread. Parse failures travel as errors in the same event so
//   the session can answer with a rejection while the connection stays open.
//   On read error/EOF, send `InternalEvent::Disconnected`.
// - **Writer threads** (one per client): drain that client's bounded
//   outbound queue, encode + frame + write. On write error or queue closure
//   they shut the socket down, which the reader observes as a disconnect.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them. It is the only thread that touches match state, so
//   slot assignment, placement, and shot resolution are naturally serialized.
//   After each event it reaps connections whose outbound queue overflowed.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `ServerHandle::stop`) and breaks out of the event loop.

use std::io::{BufReader, BufWriter};
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, sync_channel};
use std::thread;
use std::time::Duration;

use torpedo_protocol::framing::{read_message, write_message};
use torpedo_protocol::message::{ClientMessage, CommandError, ServerMessage};
use torpedo_protocol::types::ConnectionId;
use tracing::{info, warn};

use crate::session::Session;

/// How long the main loop waits for an event before re-checking the stop flag.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    CommandFrom {
        id: ConnectionId,
        command: Result<ClientMessage, CommandError>,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a session server.
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Capacity of each connection's outbound queue. A client that falls
    /// this many messages behind is disconnected.
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 65432,
            queue_depth: 64,
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host, config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    info!(%addr, "session server listening");

    let thread = thread::spawn(move || {
        run_server(listener, config, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main server loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new();

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed; listener stopping");
                    break;
                }
            }
        }
    });

    // Main event loop.
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running, config.queue_depth);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running, config.queue_depth);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event to the session, then drop any connection whose
/// outbound queue overflowed while handling it.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
    queue_depth: usize,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running, queue_depth);
        }
        InternalEvent::CommandFrom { id, command } => {
            session.handle_command(id, command);
        }
        InternalEvent::Disconnected { id } => {
            session.unregister(id);
        }
    }

    for id in session.take_defunct() {
        session.unregister(id);
    }
}

/// Handle a new TCP connection: register it with the session (which assigns
/// a slot or marks it a spectator and answers with `PlayerID:<n>`), then
/// spawn its writer and reader threads.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
    queue_depth: usize,
) {
    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "could not clone stream for new connection");
            return;
        }
    };

    let (out_tx, out_rx) = sync_channel(queue_depth);
    let id = session.register(out_tx);

    thread::spawn(move || {
        writer_loop(write_stream, out_rx);
    });

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(BufReader::new(stream), id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single client. Runs in its own thread. Frames that fail
/// to decode as commands still reach the session (as `Err`) so the client
/// gets a rejection instead of a dropped connection.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    id: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(bytes) => {
                let command = match String::from_utf8(bytes) {
                    Ok(text) => ClientMessage::parse(&text),
                    Err(_) => Err(CommandError::InvalidEncoding),
                };
                if tx.send(InternalEvent::CommandFrom { id, command }).is_err() {
                    break; // Main loop gone.
                }
            }
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { id });
                break;
            }
        }
    }
}

/// Writer loop for a single client: drain the bounded outbound queue until
/// it closes (connection unregistered) or a write fails. Either way, shut
/// the socket down so the reader thread observes the disconnect.
fn writer_loop(stream: TcpStream, outbound: Receiver<ServerMessage>) {
    let mut writer = BufWriter::new(&stream);
    while let Ok(msg) = outbound.recv() {
        if write_message(&mut writer, msg.encode().as_bytes()).is_err() {
            break;
        }
    }
    drop(writer);
    let _ = stream.shutdown(Shutdown::Both);
}
