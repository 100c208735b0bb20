// Session state for the battleship match coordinator.
//
// `Session` is the central data structure that `server.rs` drives. It tracks
// connected clients, the two player slots, placement readiness, both fleets,
// the turn pointer, and the match phase. All mutation happens through methods
// called from the server's single-threaded main loop — no internal locking.
// Two `fire` resolutions can therefore never interleave: turn check, cell
// lookup, hit mutation, sunk/defeated derivation, and turn handoff run as
// one uninterrupted step.
//
// Key responsibilities:
// - Slot pool: the first two connections check out slots 1 and 2; later
//   connections are spectators. A disconnect returns the slot to the pool.
// - Connection registry: `ConnectionId -> {slot, outbound queue}`, used to
//   route unicasts by slot and broadcasts to all slot holders.
// - Placement barrier: per-slot ready flags; when both slots have submitted
//   a fleet, the match enters the firing phase, turn goes to slot 1, and
//   `READY` is broadcast. The flags then reset so a later match can reuse
//   the barrier.
// - Firing arbiter: validates phase and turn, resolves the shot against the
//   opponent fleet (`game.rs`), and fans out every resulting notification
//   before returning.
//
// Writing to clients: `Session` holds the bounded outbound sender for each
// connection; dedicated writer threads (spawned by `server.rs`) drain them.
// `try_send` never blocks the session — a full queue marks the peer as
// defunct and the server disconnects it after the current event, instead of
// buffering without bound for a slow or dead peer.

use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::{SyncSender, TrySendError};

use torpedo_protocol::message::{ClientMessage, CommandError, ServerMessage, ShipSpec};
use torpedo_protocol::types::{ConnectionId, PlayerSlot};
use tracing::{info, warn};

use crate::game::{Fleet, ShotOutcome};

/// Pool of the two reusable player slots.
///
/// Slots are handed out in queue order and re-enter at the back on release,
/// so a freed slot goes to the next new connection. Releasing a slot that is
/// already available is a no-op — ungraceful disconnects can report twice.
#[derive(Debug)]
pub struct SlotPool {
    available: VecDeque<PlayerSlot>,
}

impl SlotPool {
    pub fn new() -> SlotPool {
        SlotPool {
            available: VecDeque::from([PlayerSlot::One, PlayerSlot::Two]),
        }
    }

    /// Check out a slot, or `None` when both are taken (caller spectates).
    pub fn acquire(&mut self) -> Option<PlayerSlot> {
        self.available.pop_front()
    }

    /// Return a slot to the pool. Idempotent.
    pub fn release(&mut self, slot: PlayerSlot) {
        if !self.available.contains(&slot) {
            self.available.push_back(slot);
        }
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        SlotPool::new()
    }
}

/// Per-slot placement readiness. Released (and self-cleared) exactly once
/// per match, when both slots have reported.
#[derive(Debug, Default)]
struct PlacementBarrier {
    ready: [bool; 2],
}

impl PlacementBarrier {
    fn index(slot: PlayerSlot) -> usize {
        match slot {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// Flag a slot ready; returns true when both slots are now ready.
    fn mark_ready(&mut self, slot: PlayerSlot) -> bool {
        self.ready[Self::index(slot)] = true;
        self.ready.iter().all(|&r| r)
    }

    fn clear(&mut self) {
        self.ready = [false; 2];
    }

    fn clear_slot(&mut self, slot: PlayerSlot) {
        self.ready[Self::index(slot)] = false;
    }
}

/// Match phase. `GameOver` is terminal for the current match; a fresh fleet
/// submission afterwards starts a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    AwaitingPlacement,
    InProgress,
    GameOver(PlayerSlot),
}

struct ClientState {
    slot: Option<PlayerSlot>,
    outbound: SyncSender<ServerMessage>,
}

/// Match session managing one battleship game at a time.
pub struct Session {
    clients: BTreeMap<ConnectionId, ClientState>,
    next_connection_id: u64,
    slots: SlotPool,
    barrier: PlacementBarrier,
    fleets: BTreeMap<PlayerSlot, Fleet>,
    phase: MatchPhase,
    current_turn: PlayerSlot,
    // Connections whose outbound queue overflowed; reaped by the server
    // after the current event.
    defunct: Vec<ConnectionId>,
}

impl Session {
    pub fn new() -> Session {
        Session {
            clients: BTreeMap::new(),
            next_connection_id: 1,
            slots: SlotPool::new(),
            barrier: PlacementBarrier::default(),
            fleets: BTreeMap::new(),
            phase: MatchPhase::AwaitingPlacement,
            current_turn: PlayerSlot::One,
            defunct: Vec::new(),
        }
    }

    /// Register a new connection: acquire a slot if one is free, store the
    /// outbound sender, and tell the client what it is (`PlayerID:<n>`, with
    /// -1 for spectators). Returns the connection ID the server uses to tag
    /// the reader thread.
    pub fn register(&mut self, outbound: SyncSender<ServerMessage>) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;

        let slot = self.slots.acquire();
        self.clients.insert(id, ClientState { slot, outbound });
        match slot {
            Some(slot) => info!(%id, %slot, "player connected"),
            None => info!(%id, "spectator connected"),
        }

        self.send_to(id, ServerMessage::PlayerAssigned { slot });
        id
    }

    /// Remove a connection. If it held a slot, the slot returns to the pool
    /// and that slot's fleet and readiness are cleared; a disconnect during
    /// the firing phase suspends the match back to placement, since the
    /// protocol has no mid-game resume.
    pub fn unregister(&mut self, id: ConnectionId) {
        let Some(state) = self.clients.remove(&id) else {
            return;
        };
        let Some(slot) = state.slot else {
            info!(%id, "spectator disconnected");
            return;
        };

        self.slots.release(slot);
        self.fleets.remove(&slot);
        self.barrier.clear_slot(slot);
        if self.phase == MatchPhase::InProgress {
            warn!(%id, %slot, "player left mid-match; placement must restart");
            self.phase = MatchPhase::AwaitingPlacement;
        } else {
            info!(%id, %slot, "player disconnected");
        }
    }

    /// Dispatch one inbound command (or parse failure) from a connection.
    pub fn handle_command(
        &mut self,
        id: ConnectionId,
        command: Result<ClientMessage, CommandError>,
    ) {
        let Some(state) = self.clients.get(&id) else {
            return; // Already unregistered.
        };

        // Spectators get the same limited answer no matter what they send.
        let Some(slot) = state.slot else {
            self.send_to(id, ServerMessage::Notice("Spectator: Commands are limited.".into()));
            return;
        };

        match command {
            Err(err) => self.send_to(id, ServerMessage::Notice(err.to_string())),
            Ok(ClientMessage::PlaceShips(ships)) => self.submit_fleet(id, slot, &ships),
            Ok(ClientMessage::Fire { x, y }) => self.fire(id, slot, x, y),
            Ok(ClientMessage::Other(text)) => {
                self.send_to(id, ServerMessage::Notice(format!("Player {slot} says: {text}")));
            }
        }
    }

    /// Placement barrier: store the fleet and flag the slot ready. A repeat
    /// submission before the match starts overwrites the previous one (the
    /// latest layout is kept). When both slots are ready the match enters
    /// the firing phase with slot 1 to move, and both players get `READY`.
    fn submit_fleet(&mut self, id: ConnectionId, slot: PlayerSlot, ships: &[ShipSpec]) {
        match self.phase {
            MatchPhase::InProgress => {
                self.send_to(id, ServerMessage::Notice("Match already in progress.".into()));
                return;
            }
            MatchPhase::GameOver(_) => {
                // Previous match ended; this submission opens the next one.
                info!("starting a new match");
                self.reset_match();
            }
            MatchPhase::AwaitingPlacement => {}
        }

        self.fleets.insert(slot, Fleet::from(ships));
        let both_ready = self.barrier.mark_ready(slot);
        info!(%slot, ships = ships.len(), "fleet placed");
        self.send_to(
            id,
            ServerMessage::Notice(format!("Player {slot} ships received.")),
        );

        if both_ready {
            self.phase = MatchPhase::InProgress;
            self.current_turn = PlayerSlot::One;
            self.barrier.clear();
            info!("both fleets placed; firing phase begins");
            self.broadcast(ServerMessage::Ready);
        }
    }

    /// Firing arbiter. Validates phase and turn, resolves the shot against
    /// the opponent fleet, and queues every resulting notification before
    /// returning. Rejections answer the shooter only — no broadcast, no
    /// state change.
    fn fire(&mut self, id: ConnectionId, slot: PlayerSlot, x: i32, y: i32) {
        if self.phase != MatchPhase::InProgress {
            self.send_to(id, ServerMessage::Notice("Not accepting shots.".into()));
            return;
        }
        if slot != self.current_turn {
            self.send_to(id, ServerMessage::Notice("Not your turn.".into()));
            return;
        }

        let opponent = slot.opponent();
        let Some(fleet) = self.fleets.get_mut(&opponent) else {
            // InProgress implies both fleets exist; guard anyway.
            self.send_to(id, ServerMessage::Notice("Opponent ships not available.".into()));
            return;
        };

        match fleet.resolve_shot(x, y) {
            ShotOutcome::AlreadyHit => {
                // A repeat shot costs nothing: rejected, turn not consumed.
                self.send_to(id, ServerMessage::Notice("Cell already hit.".into()));
            }
            ShotOutcome::Miss => {
                self.unicast(slot, ServerMessage::FireResult { x, y, hit: false });
                self.unicast(opponent, ServerMessage::OpponentShot { x, y, hit: false });
                self.pass_turn_to(opponent);
            }
            ShotOutcome::Hit {
                sunk_ship,
                fleet_defeated,
            } => {
                self.unicast(slot, ServerMessage::FireResult { x, y, hit: true });
                self.unicast(opponent, ServerMessage::OpponentShot { x, y, hit: true });

                if let Some(name) = sunk_ship {
                    self.unicast(slot, ServerMessage::ShipSunk { name: name.clone() });
                    self.unicast(opponent, ServerMessage::YourShipSunk { name });
                }

                if fleet_defeated {
                    // The deciding shot ends the match; the turn never flips.
                    self.phase = MatchPhase::GameOver(slot);
                    info!(winner = %slot, "game over");
                    self.broadcast(ServerMessage::GameOver { winner: slot });
                } else {
                    self.pass_turn_to(opponent);
                }
            }
        }
    }

    fn pass_turn_to(&mut self, slot: PlayerSlot) {
        self.current_turn = slot;
        self.broadcast(ServerMessage::NextTurn { slot });
    }

    /// Clear per-match state. Connections and slot ownership survive.
    fn reset_match(&mut self) {
        self.fleets.clear();
        self.barrier.clear();
        self.phase = MatchPhase::AwaitingPlacement;
        self.current_turn = PlayerSlot::One;
    }

    /// Deliver to the connection currently owning `slot`, silently dropping
    /// the message if that slot is unowned.
    fn unicast(&mut self, slot: PlayerSlot, msg: ServerMessage) {
        if let Some(id) = self.find_by_slot(slot) {
            self.send_to(id, msg);
        }
    }

    /// Deliver to every currently-owned slot. Spectators are skipped.
    fn broadcast(&mut self, msg: ServerMessage) {
        let ids: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|(_, state)| state.slot.is_some())
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.send_to(id, msg.clone());
        }
    }

    /// Queue a message on one connection's bounded outbound queue. A full
    /// queue means the peer is slow or dead: mark it defunct so the server
    /// disconnects it instead of letting the backlog grow.
    fn send_to(&mut self, id: ConnectionId, msg: ServerMessage) {
        let Some(state) = self.clients.get(&id) else {
            return;
        };
        match state.outbound.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%id, "outbound queue full; dropping connection");
                self.defunct.push(id);
            }
            Err(TrySendError::Disconnected(_)) => {
                // Writer thread already gone; the reader will report the
                // disconnect shortly.
            }
        }
    }

    /// The connection currently owning `slot`, if any.
    pub fn find_by_slot(&self, slot: PlayerSlot) -> Option<ConnectionId> {
        self.clients
            .iter()
            .find(|(_, state)| state.slot == Some(slot))
            .map(|(id, _)| *id)
    }

    /// Connections flagged for disconnect since the last call.
    pub fn take_defunct(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.defunct)
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn current_turn(&self) -> PlayerSlot {
        self.current_turn
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
