//! 4x4x4 board geometry with gravity-constrained columns

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Cells along each axis
pub const GRID_SIZE: u8 = 4;

/// Total cells in the cube
pub const CELL_COUNT: usize = 64;

/// Droppable (x, z) columns
pub const COLUMN_COUNT: usize = 16;

/// Highest y index (gravity axis, 0 = bottom)
const TOP: u8 = GRID_SIZE - 1;

// ============================================================================
// PLAYER
// ============================================================================

/// Side to move. Serialized as 0 / 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Player {
    First = 0,
    Second = 1,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Player::First),
            1 => Some(Player::Second),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Player::First => '0',
            Player::Second => '1',
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Player::from_index(value).ok_or(GameError::InvalidPlayer(value))
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.index()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.index())
    }
}

/// Contents of one cell
pub type Cell = Option<Player>;

// ============================================================================
// COORDINATES
// ============================================================================

/// Cell coordinate; y is the gravity axis. Serialized as `[x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 3]", into = "[u8; 3]")]
pub struct Coord {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Flat index, x-major then y then z
    pub const fn index(self) -> usize {
        self.x as usize * 16 + self.y as usize * 4 + self.z as usize
    }

    pub const fn from_index(index: usize) -> Self {
        Self::new((index / 16) as u8, ((index / 4) % 4) as u8, (index % 4) as u8)
    }

    pub fn is_valid(self) -> bool {
        self.x < GRID_SIZE && self.y < GRID_SIZE && self.z < GRID_SIZE
    }
}

impl TryFrom<[u8; 3]> for Coord {
    type Error = GameError;

    fn try_from([x, y, z]: [u8; 3]) -> Result<Self, Self::Error> {
        let coord = Coord::new(x, y, z);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GameError::InvalidEncoding(format!("coordinate [{x}, {y}, {z}] is off the board")))
        }
    }
}

impl From<Coord> for [u8; 3] {
    fn from(c: Coord) -> Self {
        [c.x, c.y, c.z]
    }
}

/// Column selector. The landing height is always derived, never supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub x: u8,
    pub z: u8,
}

impl Move {
    pub const fn new(x: u8, z: u8) -> Self {
        Self { x, z }
    }

    pub fn is_valid(self) -> bool {
        self.x < GRID_SIZE && self.z < GRID_SIZE
    }

    /// Manhattan distance to the board's vertical axis, doubled so it stays
    /// integral: 2 for the four interior columns, 6 for the corners.
    pub fn center_distance_x2(self) -> i32 {
        (2 * self.x as i32 - 3).abs() + (2 * self.z as i32 - 3).abs()
    }

    pub(crate) fn ensure_valid(self) -> Result<Self, GameError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GameError::OutOfBounds { x: self.x, z: self.z })
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Canonical transposition key: one 2-bit symbol per cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoardKey(pub u128);

/// Flat value-type board (copy to simulate)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub const fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[coord.index()]
    }

    pub fn at(&self, x: u8, y: u8, z: u8) -> Cell {
        self.get(Coord::new(x, y, z))
    }

    pub(crate) fn set(&mut self, coord: Coord, cell: Cell) {
        self.cells[coord.index()] = cell;
    }

    /// Lowest empty y in the column, `None` when the column is full
    /// Landing height, `None` for full or off-board columns
    pub fn drop_y(&self, mv: Move) -> Option<u8> {
        if !mv.is_valid() {
            return None;
        }
        (0..GRID_SIZE).find(|&y| self.at(mv.x, y, mv.z).is_none())
    }

    /// Off-board columns count as full
    pub fn is_column_full(&self, mv: Move) -> bool {
        !mv.is_valid() || self.at(mv.x, TOP, mv.z).is_some()
    }

    /// Non-full columns, x-major then z
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(COLUMN_COUNT);
        for x in 0..GRID_SIZE {
            for z in 0..GRID_SIZE {
                let mv = Move::new(x, z);
                if !self.is_column_full(mv) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    /// Drop a piece in place. Returns the landing cell, or `None` if the
    /// column is full or out of range.
    pub fn play(&mut self, mv: Move, player: Player) -> Option<Coord> {
        if !mv.is_valid() {
            return None;
        }
        let y = self.drop_y(mv)?;
        let coord = Coord::new(mv.x, y, mv.z);
        self.set(coord, Some(player));
        Some(coord)
    }

    /// Copy-and-drop, leaving `self` untouched
    pub fn with_drop(&self, mv: Move, player: Player) -> Option<(Board, Coord)> {
        let mut next = *self;
        let coord = next.play(mv, player)?;
        Some((next, coord))
    }

    /// True once the top cell of every column is occupied
    pub fn is_full(&self) -> bool {
        (0..GRID_SIZE).all(|x| (0..GRID_SIZE).all(|z| self.at(x, TOP, z).is_some()))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// A cell can be filled next turn: bottom layer or supported from below
    pub fn is_reachable(&self, coord: Coord) -> bool {
        coord.y == 0 || self.at(coord.x, coord.y - 1, coord.z).is_some()
    }

    /// All cells with their coordinates, in index order
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (Coord::from_index(i), cell))
    }

    pub fn key(&self) -> BoardKey {
        let mut key = 0u128;
        for (i, cell) in self.cells.iter().enumerate() {
            let symbol: u128 = match cell {
                None => 0,
                Some(Player::First) => 1,
                Some(Player::Second) => 2,
            };
            key |= symbol << (i * 2);
        }
        BoardKey(key)
    }

    /// 64 characters from `.01`, in flat index order
    pub fn encode(&self) -> String {
        self.cells
            .iter()
            .map(|cell| cell.map_or('.', Player::symbol))
            .collect()
    }
}

impl FromStr for Board {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = s.trim().chars().collect();
        if symbols.len() != CELL_COUNT {
            return Err(GameError::InvalidEncoding(format!(
                "expected {} cells, got {}",
                CELL_COUNT,
                symbols.len()
            )));
        }

        let mut board = Board::new();
        for (i, symbol) in symbols.into_iter().enumerate() {
            let cell = match symbol {
                '.' => None,
                '0' => Some(Player::First),
                '1' => Some(Player::Second),
                other => {
                    return Err(GameError::InvalidEncoding(format!(
                        "unexpected symbol '{other}' at cell {i}"
                    )))
                }
            };
            board.cells[i] = cell;
        }

        // Gravity: no piece may float above an empty cell
        for (coord, cell) in board.cells() {
            if cell.is_some() && !board.is_reachable(coord) {
                return Err(GameError::InvalidEncoding(format!(
                    "floating piece at [{}, {}, {}]",
                    coord.x, coord.y, coord.z
                )));
            }
        }

        Ok(board)
    }
}

impl TryFrom<String> for Board {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        board.encode()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.encode())
    }
}

/// Layers printed top (y=3) to bottom, z rows by x columns
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..GRID_SIZE).rev() {
            writeln!(f, "y={y}    x: 0 1 2 3")?;
            for z in 0..GRID_SIZE {
                write!(f, "      z={z}")?;
                for x in 0..GRID_SIZE {
                    let symbol = self.at(x, y, z).map_or('.', Player::symbol);
                    write!(f, " {symbol}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_index_roundtrip() {
        for i in 0..CELL_COUNT {
            assert_eq!(Coord::from_index(i).index(), i);
        }
        assert_eq!(Coord::new(1, 2, 3).index(), 16 + 8 + 3);
    }

    #[test]
    fn test_drop_respects_gravity() {
        let mut board = Board::new();
        let mv = Move::new(2, 1);
        assert_eq!(board.drop_y(mv), Some(0));

        for expected_y in 0..4 {
            let coord = board.play(mv, Player::First).unwrap();
            assert_eq!(coord, Coord::new(2, expected_y, 1));
        }

        assert!(board.is_column_full(mv));
        assert_eq!(board.drop_y(mv), None);
        assert_eq!(board.play(mv, Player::Second), None);
        assert_eq!(board.legal_moves().len(), COLUMN_COUNT - 1);
    }

    #[test]
    fn test_with_drop_leaves_original() {
        let board = Board::new();
        let (next, coord) = board.with_drop(Move::new(0, 0), Player::Second).unwrap();
        assert!(board.is_empty());
        assert_eq!(next.get(coord), Some(Player::Second));
    }

    #[test]
    fn test_out_of_range_move_rejected() {
        let mut board = Board::new();
        assert_eq!(board.play(Move::new(4, 0), Player::First), None);
        assert!(board.is_empty());
        assert_eq!(board.drop_y(Move::new(4, 0)), None);
        assert_eq!(board.drop_y(Move::new(1, 9)), None);
        assert!(board.is_column_full(Move::new(0, 7)));
        assert!(board.with_drop(Move::new(5, 5), Player::First).is_none());
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new();
        let mut player = Player::First;
        while let Some(&mv) = board.legal_moves().first() {
            board.play(mv, player);
            player = player.opponent();
        }
        assert!(board.is_full());
        assert_eq!(board.piece_count(), CELL_COUNT);
    }

    #[test]
    fn test_encode_parse() {
        let mut board = Board::new();
        board.play(Move::new(3, 3), Player::First);
        board.play(Move::new(3, 3), Player::Second);
        let text = board.encode();
        assert_eq!(text.len(), CELL_COUNT);
        assert_eq!(text.parse::<Board>().unwrap(), board);
    }

    #[test]
    fn test_parse_rejects_floating_piece() {
        let mut text = ".".repeat(CELL_COUNT);
        // Coord (0, 1, 0) has index 4 and nothing below it
        text.replace_range(4..5, "0");
        assert!(text.parse::<Board>().is_err());
        assert!("0".repeat(10).parse::<Board>().is_err());
    }

    #[test]
    fn test_key_distinguishes_single_cell() {
        let empty = Board::new().key();
        let mut seen = std::collections::HashSet::new();
        seen.insert(empty);
        for mv in Board::new().legal_moves() {
            for player in [Player::First, Player::Second] {
                let (board, _) = Board::new().with_drop(mv, player).unwrap();
                assert!(seen.insert(board.key()));
            }
        }
    }

    #[test]
    fn test_center_distance() {
        assert_eq!(Move::new(1, 2).center_distance_x2(), 2);
        assert_eq!(Move::new(0, 0).center_distance_x2(), 6);
        assert_eq!(Move::new(0, 1).center_distance_x2(), 4);
    }

    #[test]
    fn test_player_serde() {
        assert_eq!(serde_json::to_string(&Player::Second).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Player>("0").unwrap(), Player::First);
        assert!(serde_json::from_str::<Player>("2").is_err());
    }
}
