//! Update records exchanged with a networked-play peer
//!
//! The transport itself lives outside this crate; these are the payloads it
//! carries after every local move and applies on arrival.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Player};
use crate::game::Outcome;
use crate::lines::Line;

/// `winner` value meaning the game ended drawn
pub const DRAW_SENTINEL: i8 = -1;

/// Room lifecycle as seen by the peer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Playing,
    Finished,
}

/// Full-position update; the receiver overwrites its state with it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub board: Board,
    pub current_player: Player,
    /// Winning player index, `DRAW_SENTINEL` for a draw, `None` while playing
    pub winner: Option<i8>,
    pub winning_line: Option<Line>,
    pub status: RoomStatus,
}

impl SyncRecord {
    pub fn is_draw(&self) -> bool {
        self.winner == Some(DRAW_SENTINEL)
    }

    /// Does the declared result match an outcome derived from the board?
    pub fn agrees_with(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Ongoing => self.winner.is_none() && self.status == RoomStatus::Playing,
            Outcome::Draw => self.is_draw() && self.status == RoomStatus::Finished,
            Outcome::Won { player, line } => {
                self.winner == Some(player.index() as i8)
                    && self.winning_line == Some(line)
                    && self.status == RoomStatus::Finished
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Move;

    fn sample() -> SyncRecord {
        let mut board = Board::new();
        board.play(Move::new(1, 2), Player::First);
        SyncRecord {
            board,
            current_player: Player::Second,
            winner: None,
            winning_line: None,
            status: RoomStatus::Playing,
        }
    }

    #[test]
    fn test_wire_format() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"currentPlayer\":1"));
        assert!(json.contains("\"status\":\"playing\""));
        assert!(json.contains("\"winningLine\":null"));

        let back = SyncRecord::from_json(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_rejects_malformed_board() {
        let json = r#"{"board":"0","currentPlayer":0,"winner":null,"winningLine":null,"status":"playing"}"#;
        assert!(SyncRecord::from_json(json).is_err());
    }

    #[test]
    fn test_agreement() {
        let record = sample();
        assert!(record.agrees_with(Outcome::Ongoing));
        assert!(!record.agrees_with(Outcome::Draw));

        let drawn = SyncRecord {
            winner: Some(DRAW_SENTINEL),
            status: RoomStatus::Finished,
            ..sample()
        };
        assert!(drawn.is_draw());
        assert!(drawn.agrees_with(Outcome::Draw));
    }
}
