// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the session server.
// - `ServerMessage`: sent by the session server to game clients.
//
// The wire format is UTF-8 command text (see `encode`/`parse` on each enum),
// carried inside the length-delimited frames of `framing.rs`. The command
// grammar is fixed by the clients already in the field:
//
//   client → server   SHIPSPLACED_<json>        FIRE_<x>_<y>
//   server → client   PlayerID:<n>              READY
//                     FIRE_RESULT_HIT_<x>_<y>   FIRE_RESULT_MISS_<x>_<y>
//                     OPPONENT_HIT_<x>_<y>      OPPONENT_MISS_<x>_<y>
//                     SHIP_SUNK_<name>          YOUR_SHIP_SUNK_<name>
//                     GAME_OVER_Player_<n>_Wins NEXT_TURN_<n>
//                     <plain notice text>
//
// The ship-placement payload is JSON with the capitalized field names
// (`Name`, `Cells`, `X`, `Y`) the original clients serialize.
//
// Parsing a client command can fail — malformed fire coordinates, an
// undecodable ship payload — and those failures carry the exact rejection
// string the server sends back (`CommandError` implements `Display` with the
// wire text). Server messages never fail to parse: any text that matches no
// structured format is a `Notice`, which is also how plain rejection strings
// reach the client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PlayerSlot;

/// One ship in a fleet submission. Field names match the JSON the clients
/// send after the `SHIPSPLACED_` prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSpec {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Cells")]
    pub cells: Vec<CellSpec>,
}

/// One cell coordinate within a ship submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
}

/// A client command that could not be decoded. The `Display` strings are the
/// rejection notices sent back over the wire, so the offending connection
/// gets an answer and stays open.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `FIRE_` command with the wrong arity or non-integer coordinates.
    #[error("Invalid fire command.")]
    InvalidFire,
    /// `SHIPSPLACED_` payload that is not valid JSON, or an empty fleet.
    #[error("Invalid ship data.")]
    InvalidShipData,
    /// Frame payload that is not UTF-8 text.
    #[error("Invalid command encoding.")]
    InvalidEncoding,
}

/// Messages sent by a client to the session server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Submit a complete fleet layout for the placement barrier.
    PlaceShips(Vec<ShipSpec>),
    /// Shot request at integer coordinates.
    Fire { x: i32, y: i32 },
    /// Anything else — echoed back by the server.
    Other(String),
}

const SHIPSPLACED_PREFIX: &str = "SHIPSPLACED_";
const FIRE_PREFIX: &str = "FIRE_";

impl ClientMessage {
    /// Parse one inbound command.
    pub fn parse(text: &str) -> Result<ClientMessage, CommandError> {
        if let Some(json) = text.strip_prefix(SHIPSPLACED_PREFIX) {
            let ships: Vec<ShipSpec> =
                serde_json::from_str(json).map_err(|_| CommandError::InvalidShipData)?;
            if ships.is_empty() {
                return Err(CommandError::InvalidShipData);
            }
            return Ok(ClientMessage::PlaceShips(ships));
        }

        if text.starts_with(FIRE_PREFIX) {
            // The clients format exactly FIRE_<x>_<y>; anything with a
            // different part count is malformed rather than extra data.
            let parts: Vec<&str> = text.split('_').collect();
            if parts.len() != 3 {
                return Err(CommandError::InvalidFire);
            }
            let x = parts[1].parse().map_err(|_| CommandError::InvalidFire)?;
            let y = parts[2].parse().map_err(|_| CommandError::InvalidFire)?;
            return Ok(ClientMessage::Fire { x, y });
        }

        Ok(ClientMessage::Other(text.to_string()))
    }

    /// Render the command as wire text.
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::PlaceShips(ships) => {
                // ShipSpec contains no non-serializable values, so this
                // cannot fail in practice.
                let json = serde_json::to_string(ships).unwrap_or_default();
                format!("{SHIPSPLACED_PREFIX}{json}")
            }
            ClientMessage::Fire { x, y } => format!("FIRE_{x}_{y}"),
            ClientMessage::Other(text) => text.clone(),
        }
    }
}

/// Messages sent by the session server to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Slot assignment on connect; `None` marks a spectator (wire: -1).
    PlayerAssigned { slot: Option<PlayerSlot> },
    /// Both fleets placed; the firing phase begins.
    Ready,
    /// Outcome of the recipient's own shot.
    FireResult { x: i32, y: i32, hit: bool },
    /// Notice of an incoming shot outcome on the recipient's fleet.
    OpponentShot { x: i32, y: i32, hit: bool },
    /// A ship of the recipient's opponent was sunk.
    ShipSunk { name: String },
    /// A ship of the recipient's own fleet was sunk.
    YourShipSunk { name: String },
    /// Terminal announcement naming the winner.
    GameOver { winner: PlayerSlot },
    /// Turn handoff announcement.
    NextTurn { slot: PlayerSlot },
    /// Plain text: acks, rejections, echoes.
    Notice(String),
}

impl ServerMessage {
    /// Render the message as wire text.
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::PlayerAssigned { slot } => {
                let n = slot.map_or(-1, PlayerSlot::number);
                format!("PlayerID:{n}")
            }
            ServerMessage::Ready => "READY".to_string(),
            ServerMessage::FireResult { x, y, hit: true } => format!("FIRE_RESULT_HIT_{x}_{y}"),
            ServerMessage::FireResult { x, y, hit: false } => format!("FIRE_RESULT_MISS_{x}_{y}"),
            ServerMessage::OpponentShot { x, y, hit: true } => format!("OPPONENT_HIT_{x}_{y}"),
            ServerMessage::OpponentShot { x, y, hit: false } => format!("OPPONENT_MISS_{x}_{y}"),
            ServerMessage::ShipSunk { name } => format!("SHIP_SUNK_{name}"),
            ServerMessage::YourShipSunk { name } => format!("YOUR_SHIP_SUNK_{name}"),
            ServerMessage::GameOver { winner } => format!("GAME_OVER_Player_{winner}_Wins"),
            ServerMessage::NextTurn { slot } => format!("NEXT_TURN_{slot}"),
            ServerMessage::Notice(text) => text.clone(),
        }
    }

    /// Parse server wire text. Never fails: text matching no structured
    /// format (including every rejection string) becomes a `Notice`.
    pub fn parse(text: &str) -> ServerMessage {
        if let Some(rest) = text.strip_prefix("PlayerID:") {
            if let Ok(n) = rest.parse::<i32>() {
                if n == -1 {
                    return ServerMessage::PlayerAssigned { slot: None };
                }
                if let Some(slot) = PlayerSlot::from_number(n) {
                    return ServerMessage::PlayerAssigned { slot: Some(slot) };
                }
            }
            return ServerMessage::Notice(text.to_string());
        }

        if text == "READY" {
            return ServerMessage::Ready;
        }

        if let Some(rest) = text.strip_prefix("FIRE_RESULT_HIT_") {
            if let Some((x, y)) = parse_coords(rest) {
                return ServerMessage::FireResult { x, y, hit: true };
            }
        }
        if let Some(rest) = text.strip_prefix("FIRE_RESULT_MISS_") {
            if let Some((x, y)) = parse_coords(rest) {
                return ServerMessage::FireResult { x, y, hit: false };
            }
        }
        if let Some(rest) = text.strip_prefix("OPPONENT_HIT_") {
            if let Some((x, y)) = parse_coords(rest) {
                return ServerMessage::OpponentShot { x, y, hit: true };
            }
        }
        if let Some(rest) = text.strip_prefix("OPPONENT_MISS_") {
            if let Some((x, y)) = parse_coords(rest) {
                return ServerMessage::OpponentShot { x, y, hit: false };
            }
        }

        if let Some(name) = text.strip_prefix("YOUR_SHIP_SUNK_") {
            return ServerMessage::YourShipSunk {
                name: name.to_string(),
            };
        }
        if let Some(name) = text.strip_prefix("SHIP_SUNK_") {
            return ServerMessage::ShipSunk {
                name: name.to_string(),
            };
        }

        if let Some(rest) = text.strip_prefix("GAME_OVER_Player_") {
            if let Some(n) = rest.strip_suffix("_Wins") {
                if let Some(winner) = n.parse().ok().and_then(PlayerSlot::from_number) {
                    return ServerMessage::GameOver { winner };
                }
            }
        }

        if let Some(rest) = text.strip_prefix("NEXT_TURN_") {
            if let Some(slot) = rest.parse().ok().and_then(PlayerSlot::from_number) {
                return ServerMessage::NextTurn { slot };
            }
        }

        ServerMessage::Notice(text.to_string())
    }
}

/// Parse `<x>_<y>` with integer coordinates.
fn parse_coords(rest: &str) -> Option<(i32, i32)> {
    let (x, y) = rest.split_once('_')?;
    Some((x.parse().ok()?, y.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fire_command() {
        assert_eq!(
            ClientMessage::parse("FIRE_5_5"),
            Ok(ClientMessage::Fire { x: 5, y: 5 })
        );
        assert_eq!(
            ClientMessage::parse("FIRE_0_12"),
            Ok(ClientMessage::Fire { x: 0, y: 12 })
        );
    }

    #[test]
    fn malformed_fire_rejected() {
        assert_eq!(
            ClientMessage::parse("FIRE_5"),
            Err(CommandError::InvalidFire)
        );
        assert_eq!(
            ClientMessage::parse("FIRE_5_5_5"),
            Err(CommandError::InvalidFire)
        );
        assert_eq!(
            ClientMessage::parse("FIRE_a_b"),
            Err(CommandError::InvalidFire)
        );
    }

    #[test]
    fn parse_ships_placed() {
        let msg = ClientMessage::parse(r#"SHIPSPLACED_[{"Name":"Sub","Cells":[{"X":0,"Y":0}]}]"#)
            .unwrap();
        match msg {
            ClientMessage::PlaceShips(ships) => {
                assert_eq!(ships.len(), 1);
                assert_eq!(ships[0].name, "Sub");
                assert_eq!(ships[0].cells, vec![CellSpec { x: 0, y: 0 }]);
            }
            other => panic!("expected PlaceShips, got {other:?}"),
        }
    }

    #[test]
    fn bad_ship_payload_rejected() {
        assert_eq!(
            ClientMessage::parse("SHIPSPLACED_not json"),
            Err(CommandError::InvalidShipData)
        );
        // An empty fleet is not a placement.
        assert_eq!(
            ClientMessage::parse("SHIPSPLACED_[]"),
            Err(CommandError::InvalidShipData)
        );
    }

    #[test]
    fn unknown_text_is_other() {
        assert_eq!(
            ClientMessage::parse("hello there"),
            Ok(ClientMessage::Other("hello there".to_string()))
        );
    }

    #[test]
    fn ship_payload_field_names() {
        // The JSON must keep the capitalized field names existing clients send.
        let ships = vec![ShipSpec {
            name: "Sub".to_string(),
            cells: vec![CellSpec { x: 3, y: 7 }],
        }];
        let encoded = ClientMessage::PlaceShips(ships).encode();
        assert_eq!(
            encoded,
            r#"SHIPSPLACED_[{"Name":"Sub","Cells":[{"X":3,"Y":7}]}]"#
        );
    }

    #[test]
    fn rejection_strings_match_wire_text() {
        assert_eq!(CommandError::InvalidFire.to_string(), "Invalid fire command.");
        assert_eq!(
            CommandError::InvalidShipData.to_string(),
            "Invalid ship data."
        );
    }

    #[test]
    fn encode_server_messages() {
        assert_eq!(
            ServerMessage::PlayerAssigned {
                slot: Some(PlayerSlot::One)
            }
            .encode(),
            "PlayerID:1"
        );
        assert_eq!(
            ServerMessage::PlayerAssigned { slot: None }.encode(),
            "PlayerID:-1"
        );
        assert_eq!(ServerMessage::Ready.encode(), "READY");
        assert_eq!(
            ServerMessage::FireResult {
                x: 5,
                y: 5,
                hit: true
            }
            .encode(),
            "FIRE_RESULT_HIT_5_5"
        );
        assert_eq!(
            ServerMessage::FireResult {
                x: 2,
                y: 9,
                hit: false
            }
            .encode(),
            "FIRE_RESULT_MISS_2_9"
        );
        assert_eq!(
            ServerMessage::OpponentShot {
                x: 5,
                y: 5,
                hit: true
            }
            .encode(),
            "OPPONENT_HIT_5_5"
        );
        assert_eq!(
            ServerMessage::OpponentShot {
                x: 1,
                y: 0,
                hit: false
            }
            .encode(),
            "OPPONENT_MISS_1_0"
        );
        assert_eq!(
            ServerMessage::ShipSunk {
                name: "Sub".to_string()
            }
            .encode(),
            "SHIP_SUNK_Sub"
        );
        assert_eq!(
            ServerMessage::YourShipSunk {
                name: "Sub".to_string()
            }
            .encode(),
            "YOUR_SHIP_SUNK_Sub"
        );
        assert_eq!(
            ServerMessage::GameOver {
                winner: PlayerSlot::One
            }
            .encode(),
            "GAME_OVER_Player_1_Wins"
        );
        assert_eq!(
            ServerMessage::NextTurn {
                slot: PlayerSlot::Two
            }
            .encode(),
            "NEXT_TURN_2"
        );
    }

    #[test]
    fn parse_server_messages() {
        assert_eq!(
            ServerMessage::parse("PlayerID:2"),
            ServerMessage::PlayerAssigned {
                slot: Some(PlayerSlot::Two)
            }
        );
        assert_eq!(
            ServerMessage::parse("PlayerID:-1"),
            ServerMessage::PlayerAssigned { slot: None }
        );
        assert_eq!(ServerMessage::parse("READY"), ServerMessage::Ready);
        assert_eq!(
            ServerMessage::parse("FIRE_RESULT_MISS_4_8"),
            ServerMessage::FireResult {
                x: 4,
                y: 8,
                hit: false
            }
        );
        assert_eq!(
            ServerMessage::parse("OPPONENT_HIT_0_0"),
            ServerMessage::OpponentShot {
                x: 0,
                y: 0,
                hit: true
            }
        );
        assert_eq!(
            ServerMessage::parse("GAME_OVER_Player_2_Wins"),
            ServerMessage::GameOver {
                winner: PlayerSlot::Two
            }
        );
        assert_eq!(
            ServerMessage::parse("NEXT_TURN_1"),
            ServerMessage::NextTurn {
                slot: PlayerSlot::One
            }
        );
    }

    #[test]
    fn sunk_ship_names_keep_underscores() {
        // Ship names are free text; everything after the prefix is the name.
        assert_eq!(
            ServerMessage::parse("SHIP_SUNK_Big_Bertha"),
            ServerMessage::ShipSunk {
                name: "Big_Bertha".to_string()
            }
        );
        assert_eq!(
            ServerMessage::parse("YOUR_SHIP_SUNK_Big_Bertha"),
            ServerMessage::YourShipSunk {
                name: "Big_Bertha".to_string()
            }
        );
    }

    #[test]
    fn plain_text_parses_as_notice() {
        assert_eq!(
            ServerMessage::parse("Cell already hit."),
            ServerMessage::Notice("Cell already hit.".to_string())
        );
        // A structured prefix with garbage after it degrades to a notice
        // rather than an error.
        assert_eq!(
            ServerMessage::parse("NEXT_TURN_9"),
            ServerMessage::Notice("NEXT_TURN_9".to_string())
        );
        assert_eq!(
            ServerMessage::parse("PlayerID:zebra"),
            ServerMessage::Notice("PlayerID:zebra".to_string())
        );
    }
}
