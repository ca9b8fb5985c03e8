//! The 76 winning lines of the 4x4x4 cube and win detection over them

use crate::board::{Board, Coord, Player, CELL_COUNT};

/// Four cells in a row
pub type Line = [Coord; 4];

pub const LINE_COUNT: usize = 76;

/// No cell lies on more than seven lines (corners and the inner 2x2x2 core)
const MAX_LINES_PER_CELL: usize = 7;

const LINES: [Line; LINE_COUNT] = generate_lines();

/// All winning lines in generation order: x rows, y columns, z pillars,
/// XY / XZ / YZ plane diagonals, then the four space diagonals.
pub static WINNING_LINES: [Line; LINE_COUNT] = LINES;

static CELL_LINES: [CellLines; CELL_COUNT] = index_cells(&LINES);

#[derive(Clone, Copy)]
struct CellLines {
    ids: [u8; MAX_LINES_PER_CELL],
    len: u8,
}

// ============================================================================
// GENERATION
// ============================================================================

const fn ray(x: i8, y: i8, z: i8, dx: i8, dy: i8, dz: i8) -> Line {
    let mut line = [Coord::new(0, 0, 0); 4];
    let mut i = 0;
    while i < 4 {
        let step = i as i8;
        line[i] = Coord::new(
            (x + dx * step) as u8,
            (y + dy * step) as u8,
            (z + dz * step) as u8,
        );
        i += 1;
    }
    line
}

const fn generate_lines() -> [Line; LINE_COUNT] {
    let mut lines = [[Coord::new(0, 0, 0); 4]; LINE_COUNT];
    let mut n = 0;

    // Rows along x
    let mut a = 0;
    while a < 4 {
        let mut b = 0;
        while b < 4 {
            lines[n] = ray(0, a, b, 1, 0, 0);
            n += 1;
            b += 1;
        }
        a += 1;
    }

    // Columns along y
    a = 0;
    while a < 4 {
        let mut b = 0;
        while b < 4 {
            lines[n] = ray(a, 0, b, 0, 1, 0);
            n += 1;
            b += 1;
        }
        a += 1;
    }

    // Pillars along z
    a = 0;
    while a < 4 {
        let mut b = 0;
        while b < 4 {
            lines[n] = ray(a, b, 0, 0, 0, 1);
            n += 1;
            b += 1;
        }
        a += 1;
    }

    // XY plane diagonals, two per z level
    a = 0;
    while a < 4 {
        lines[n] = ray(0, 0, a, 1, 1, 0);
        lines[n + 1] = ray(3, 0, a, -1, 1, 0);
        n += 2;
        a += 1;
    }

    // XZ plane diagonals, two per y level
    a = 0;
    while a < 4 {
        lines[n] = ray(0, a, 0, 1, 0, 1);
        lines[n + 1] = ray(3, a, 0, -1, 0, 1);
        n += 2;
        a += 1;
    }

    // YZ plane diagonals, two per x level
    a = 0;
    while a < 4 {
        lines[n] = ray(a, 0, 0, 0, 1, 1);
        lines[n + 1] = ray(a, 3, 0, 0, -1, 1);
        n += 2;
        a += 1;
    }

    // Space diagonals
    lines[n] = ray(0, 0, 0, 1, 1, 1);
    lines[n + 1] = ray(3, 0, 0, -1, 1, 1);
    lines[n + 2] = ray(0, 3, 0, 1, -1, 1);
    lines[n + 3] = ray(0, 0, 3, 1, 1, -1);

    lines
}

const fn index_cells(lines: &[Line; LINE_COUNT]) -> [CellLines; CELL_COUNT] {
    let mut table = [CellLines {
        ids: [0; MAX_LINES_PER_CELL],
        len: 0,
    }; CELL_COUNT];

    let mut l = 0;
    while l < LINE_COUNT {
        let mut i = 0;
        while i < 4 {
            let cell = lines[l][i].index();
            let len = table[cell].len as usize;
            table[cell].ids[len] = l as u8;
            table[cell].len += 1;
            i += 1;
        }
        l += 1;
    }
    table
}

// ============================================================================
// WIN DETECTION
// ============================================================================

/// A completed line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Win {
    pub player: Player,
    pub line: Line,
    /// Position of `line` in `WINNING_LINES`
    pub line_index: usize,
}

/// First line (in generation order) fully owned by one player.
///
/// When one move completes several lines only the first-enumerated one is
/// reported.
pub fn check_winner(board: &Board) -> Option<Win> {
    WINNING_LINES
        .iter()
        .enumerate()
        .find_map(|(line_index, line)| {
            let player = board.get(line[0])?;
            line[1..]
                .iter()
                .all(|&c| board.get(c) == Some(player))
                .then_some(Win {
                    player,
                    line: *line,
                    line_index,
                })
        })
}

/// Line indices passing through a cell
pub fn line_ids_through(coord: Coord) -> &'static [u8] {
    let entry = &CELL_LINES[coord.index()];
    &entry.ids[..entry.len as usize]
}

/// Lines passing through a cell
pub fn lines_through(coord: Coord) -> impl Iterator<Item = &'static Line> {
    line_ids_through(coord)
        .iter()
        .map(|&id| &WINNING_LINES[id as usize])
}

/// Does `player` own a complete line through `coord`?
pub fn completes_line(board: &Board, coord: Coord, player: Player) -> bool {
    lines_through(coord).any(|line| line.iter().all(|&c| board.get(c) == Some(player)))
}

pub fn line_index(line: &Line) -> Option<usize> {
    WINNING_LINES.iter().position(|l| l == line)
}

pub fn is_winning_line(line: &Line) -> bool {
    line_index(line).is_some()
}
