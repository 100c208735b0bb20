// Fleet state and shot resolution.
//
// This module is pure game logic: no transport, no session bookkeeping. A
// `Fleet` is built from the `ShipSpec` payload a client submits and mutated
// only through `resolve_shot`, which evaluates one shot in a fixed order:
// find the matching cell, mark it hit, then derive ship-sunk and
// fleet-defeated from the updated hit flags. Sunk and defeated are never
// stored — they are recomputed from cell state, so they cannot drift.
//
// A cell's hit flag is monotonic: once true it never reverts for the
// lifetime of the fleet. Re-targeting a hit cell yields `AlreadyHit` and
// mutates nothing.

use torpedo_protocol::ShipSpec;

/// One coordinate of a ship. Coordinates are immutable; only the hit flag
/// transitions, and only false → true.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub hit: bool,
}

/// A named ship occupying an ordered set of cells. Size is the cell count.
#[derive(Clone, Debug)]
pub struct Ship {
    name: String,
    cells: Vec<Cell>,
}

impl Ship {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// A ship is sunk when every one of its cells has been hit.
    pub fn is_sunk(&self) -> bool {
        self.cells.iter().all(|c| c.hit)
    }
}

/// The complete set of one player's ships.
#[derive(Clone, Debug, Default)]
pub struct Fleet {
    ships: Vec<Ship>,
}

/// Outcome of resolving one shot against a fleet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShotOutcome {
    /// No ship occupies the targeted cell.
    Miss,
    /// The targeted cell was hit by an earlier shot; nothing changed.
    AlreadyHit,
    /// A fresh hit. `sunk_ship` names the ship if this shot sank it;
    /// `fleet_defeated` is set when the whole fleet is now sunk.
    Hit {
        sunk_ship: Option<String>,
        fleet_defeated: bool,
    },
}

impl Fleet {
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// A fleet is defeated when every ship in it is sunk.
    pub fn is_defeated(&self) -> bool {
        self.ships.iter().all(Ship::is_sunk)
    }

    /// Resolve a shot at (x, y). Scans ships in submission order; the first
    /// matching cell decides the outcome.
    pub fn resolve_shot(&mut self, x: i32, y: i32) -> ShotOutcome {
        for i in 0..self.ships.len() {
            let ship = &mut self.ships[i];
            let Some(cell) = ship.cells.iter_mut().find(|c| c.x == x && c.y == y) else {
                continue;
            };
            if cell.hit {
                return ShotOutcome::AlreadyHit;
            }
            cell.hit = true;
            // Derived strictly from the updated hit flags, in this order:
            // cell hit, then ship sunk, then fleet defeated.
            let sunk_ship = ship.is_sunk().then(|| ship.name.clone());
            let fleet_defeated = self.is_defeated();
            return ShotOutcome::Hit {
                sunk_ship,
                fleet_defeated,
            };
        }
        ShotOutcome::Miss
    }
}

impl From<&[ShipSpec]> for Fleet {
    fn from(specs: &[ShipSpec]) -> Fleet {
        let ships = specs
            .iter()
            .map(|spec| Ship {
                name: spec.name.clone(),
                cells: spec
                    .cells
                    .iter()
                    .map(|c| Cell {
                        x: c.x,
                        y: c.y,
                        hit: false,
                    })
                    .collect(),
            })
            .collect();
        Fleet { ships }
    }
}
