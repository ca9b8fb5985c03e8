//! Position evaluation

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord, Move, Player, GRID_SIZE};
use crate::lines::{check_winner, completes_line, Line, WINNING_LINES};

/// Win value (beyond any heuristic total)
pub const WIN_SCORE: i32 = 100_000;

/// Heuristic weights for position evaluation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Three own pieces with a reachable empty cell
    pub threat_3: i32,
    /// Two own pieces, two empties
    pub threat_2: i32,
    /// One own piece, three empties
    pub potential_1: i32,
    /// Per piece in the four interior columns
    pub center: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            threat_3: 1000,
            threat_2: 50,
            potential_1: 5,
            center: 10,
        }
    }
}

/// Piece and empty counts along one line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LineTally {
    first: u8,
    second: u8,
    empty: u8,
    reachable_empty: u8,
}

impl LineTally {
    fn of(board: &Board, line: &Line) -> Self {
        let mut tally = Self::default();
        for &coord in line {
            match board.get(coord) {
                Some(Player::First) => tally.first += 1,
                Some(Player::Second) => tally.second += 1,
                None => {
                    tally.empty += 1;
                    if board.is_reachable(coord) {
                        tally.reachable_empty += 1;
                    }
                }
            }
        }
        tally
    }

    fn count(&self, player: Player) -> u8 {
        match player {
            Player::First => self.first,
            Player::Second => self.second,
        }
    }

    /// Value of `own` pieces on an otherwise uncontested line
    fn pattern_value(&self, own: u8, weights: &EvalWeights) -> i32 {
        match own {
            3 if self.reachable_empty >= 1 => weights.threat_3,
            2 if self.empty == 2 => weights.threat_2,
            1 if self.empty == 3 => weights.potential_1,
            _ => 0,
        }
    }
}

/// Evaluate from `player`'s perspective with default weights.
///
/// Won boards score ±`WIN_SCORE`, drawn boards 0.
pub fn evaluate_board(board: &Board, player: Player) -> i32 {
    evaluate_with(board, player, &EvalWeights::default())
}

pub fn evaluate_with(board: &Board, player: Player, weights: &EvalWeights) -> i32 {
    if let Some(win) = check_winner(board) {
        return if win.player == player { WIN_SCORE } else { -WIN_SCORE };
    }
    if board.is_full() {
        return 0;
    }
    heuristic_score(board, player, weights)
}

/// Line and centre heuristic only; the caller has ruled out terminal boards
pub(crate) fn heuristic_score(board: &Board, player: Player, weights: &EvalWeights) -> i32 {
    let opponent = player.opponent();
    let mut score = 0;

    for line in WINNING_LINES.iter() {
        let tally = LineTally::of(board, line);
        let own = tally.count(player);
        let theirs = tally.count(opponent);

        // Contested lines can never be completed
        if own > 0 && theirs > 0 {
            continue;
        }
        score += tally.pattern_value(own, weights);
        score -= tally.pattern_value(theirs, weights);
    }

    for x in 1..=2 {
        for z in 1..=2 {
            for y in 0..GRID_SIZE {
                match board.at(x, y, z) {
                    Some(p) if p == player => score += weights.center,
                    Some(_) => score -= weights.center,
                    None => {}
                }
            }
        }
    }

    score
}

/// Lines where `player` holds three cells and the fourth is empty and
/// playable right now.
pub fn count_threats(board: &Board, player: Player) -> usize {
    WINNING_LINES
        .iter()
        .filter(|line| {
            let tally = LineTally::of(board, line);
            tally.count(player) == 3 && tally.empty == 1 && tally.reachable_empty == 1
        })
        .count()
}

/// Would dropping `player` into `mv` complete a line?
pub fn is_winning_drop(board: &Board, mv: Move, player: Player) -> bool {
    board
        .with_drop(mv, player)
        .is_some_and(|(next, coord)| completes_line(&next, coord, player))
}

/// Landing cell for `mv`, if the column has room
pub fn landing(board: &Board, mv: Move) -> Option<Coord> {
    board.drop_y(mv).map(|y| Coord::new(mv.x, y, mv.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn random_board(rng: &mut ChaCha8Rng, pieces: usize) -> Board {
        let mut board = Board::new();
        let mut player = Player::First;
        for _ in 0..pieces {
            let moves = board.legal_moves();
            let Some(&mv) = moves.choose(rng) else { break };
            board.play(mv, player);
            player = player.opponent();
        }
        board
    }

    #[test]
    fn test_landing_off_board() {
        let mut board = Board::new();
        board.play(Move::new(2, 3), Player::First);
        assert_eq!(landing(&board, Move::new(2, 3)), Some(Coord::new(2, 1, 3)));
        assert_eq!(landing(&board, Move::new(4, 3)), None);
        assert!(!is_winning_drop(&board, Move::new(3, 4), Player::First));
    }

    #[test]
    fn test_empty_board_is_level() {
        assert_eq!(evaluate_board(&Board::new(), Player::First), 0);
    }

    #[test]
    fn test_perspective_antisymmetry() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut checked = 0;
        for n in 0..200 {
            let board = random_board(&mut rng, n % 40);
            if check_winner(&board).is_some() {
                continue;
            }
            assert_eq!(
                evaluate_board(&board, Player::First),
                -evaluate_board(&board, Player::Second),
                "asymmetric score for {}",
                board.encode()
            );
            checked += 1;
        }
        assert!(checked > 50);
    }

    #[test]
    fn test_terminal_scores() {
        let mut board = Board::new();
        for _ in 0..4 {
            board.play(Move::new(3, 0), Player::Second);
        }
        assert_eq!(evaluate_board(&board, Player::Second), WIN_SCORE);
        assert_eq!(evaluate_board(&board, Player::First), -WIN_SCORE);
    }

    #[test]
    fn test_center_and_threat_bonus() {
        let mut board = Board::new();
        board.play(Move::new(1, 1), Player::First);
        // Four open lines plus the interior-column bonus
        assert_eq!(evaluate_board(&board, Player::First), 4 * 5 + 10);

        // A corner sits on seven lines but earns no centre bonus
        let mut corner = Board::new();
        corner.play(Move::new(0, 0), Player::First);
        assert_eq!(evaluate_board(&corner, Player::First), 7 * 5);

        let mut threat = Board::new();
        for _ in 0..3 {
            threat.play(Move::new(0, 0), Player::First);
        }
        assert_eq!(count_threats(&threat, Player::First), 1);
        assert!(evaluate_board(&threat, Player::First) >= 1000);
    }

    #[test]
    fn test_unreachable_threat_not_counted() {
        // Three in a row on y=1 with the fourth cell floating over an empty column
        let mut board = Board::new();
        for x in 0..3 {
            board.play(Move::new(x, 0), Player::Second);
            board.play(Move::new(x, 0), Player::First);
        }
        assert_eq!(count_threats(&board, Player::First), 0);
        board.play(Move::new(3, 0), Player::Second);
        assert_eq!(count_threats(&board, Player::First), 1);
    }

    #[test]
    fn test_winning_drop() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.play(Move::new(2, 2), Player::First);
        }
        assert!(is_winning_drop(&board, Move::new(2, 2), Player::First));
        assert!(!is_winning_drop(&board, Move::new(2, 2), Player::Second));
        assert!(!is_winning_drop(&board, Move::new(1, 2), Player::First));
    }
}
