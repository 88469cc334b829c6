//! Movement rules.
//!
//! A rule is a pure function of `(board, origin, team)` to a set of
//! destination squares. Rules know nothing about turn order or check and
//! carry no per-piece memory, so a single instance is shared (behind an
//! `Arc`) by every piece that uses it.
//!
//! Offsets are team-relative: the rank component is multiplied by the
//! moving team's forward direction. Symmetric tables (knight, king, rook)
//! are unaffected; asymmetric ones (pawn, backward step) mirror for Black.

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::board::{Board, Cell};
use crate::{PieceType, Position, Team};

/// `(file delta, rank delta)`, rank delta relative to the team's forward direction.
pub type Offset = (i32, i32);

pub const ORTHOGONAL: [Offset; 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub const DIAGONAL: [Offset; 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];
pub const ALL_DIRECTIONS: [Offset; 8] = [
    (0, 1), (1, 1), (1, 0), (1, -1),
    (0, -1), (-1, -1), (-1, 0), (-1, 1),
];
pub const KNIGHT_OFFSETS: [Offset; 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2),
    (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];

/// Distance value meaning "walk until blocked".
pub const UNBOUNDED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementRule {
    /// Fixed offset table, nothing in between is inspected.
    Jump { offsets: Vec<Offset> },
    /// Walk each direction one square at a time until blocked.
    Slide {
        directions: Vec<Offset>,
        max_distance: i32,
        /// Accept only the square at exactly `max_distance`.
        exact: bool,
    },
    /// One square per offset.
    Step { offsets: Vec<Offset> },
    /// Forward push, double push from the pawn rank, diagonal captures.
    Pawn,
    Null,
}

enum Landing {
    OffBoard,
    Blocked,
    Empty,
    Capture,
}

fn landing(board: &Board, pos: Position, team: Team) -> Landing {
    match board.cell(pos) {
        None => Landing::OffBoard,
        Some(Cell::Obstacle) => Landing::Blocked,
        Some(Cell::Empty) => Landing::Empty,
        Some(Cell::Occupied(id)) => match board.piece(*id) {
            Some(other) if other.team != team => Landing::Capture,
            _ => Landing::Blocked,
        },
    }
}

impl MovementRule {
    pub fn destinations(&self, board: &Board, from: Position, team: Team) -> BTreeSet<Position> {
        let mut out = BTreeSet::new();
        self.collect_into(board, from, team, &mut out);
        out
    }

    /// Adds this rule's destinations to `out`. Squares already present are
    /// left alone, which is what makes a piece's rule list a union.
    pub fn collect_into(
        &self,
        board: &Board,
        from: Position,
        team: Team,
        out: &mut BTreeSet<Position>,
    ) {
        let forward = team.forward();
        match self {
            MovementRule::Jump { offsets } | MovementRule::Step { offsets } => {
                for &(df, dr) in offsets {
                    let to = from.offset(df, dr * forward);
                    if let Landing::Empty | Landing::Capture = landing(board, to, team) {
                        out.insert(to);
                    }
                }
            }
            MovementRule::Slide { directions, max_distance, exact } => {
                for &(df, dr) in directions {
                    let mut current = from;
                    let mut distance = 0;
                    loop {
                        if *max_distance >= 0 && distance >= *max_distance {
                            break;
                        }
                        current = current.offset(df, dr * forward);
                        distance += 1;
                        let accepted = !*exact || distance == *max_distance;
                        match landing(board, current, team) {
                            Landing::OffBoard | Landing::Blocked => break,
                            Landing::Empty => {
                                if accepted {
                                    out.insert(current);
                                }
                            }
                            Landing::Capture => {
                                if accepted {
                                    out.insert(current);
                                }
                                break;
                            }
                        }
                    }
                }
            }
            MovementRule::Pawn => {
                let one = from.offset(0, forward);
                if let Landing::Empty = landing(board, one, team) {
                    out.insert(one);
                    let two = from.offset(0, 2 * forward);
                    if from.rank == team.pawn_rank(board.height()) {
                        if let Landing::Empty = landing(board, two, team) {
                            out.insert(two);
                        }
                    }
                }
                for df in [-1, 1] {
                    let to = from.offset(df, forward);
                    if let Landing::Capture = landing(board, to, team) {
                        out.insert(to);
                    }
                }
            }
            MovementRule::Null => {}
        }
    }
}

// Shared instances of the fixed rules. Built once, cloned as `Arc`s.
static PAWN: Lazy<Arc<MovementRule>> = Lazy::new(|| Arc::new(MovementRule::Pawn));
static KNIGHT: Lazy<Arc<MovementRule>> = Lazy::new(|| {
    Arc::new(MovementRule::Jump { offsets: KNIGHT_OFFSETS.to_vec() })
});
static BISHOP: Lazy<Arc<MovementRule>> = Lazy::new(|| slide(&DIAGONAL, UNBOUNDED));
static ROOK: Lazy<Arc<MovementRule>> = Lazy::new(|| slide(&ORTHOGONAL, UNBOUNDED));
static QUEEN: Lazy<Arc<MovementRule>> = Lazy::new(|| slide(&ALL_DIRECTIONS, UNBOUNDED));
static KING: Lazy<Arc<MovementRule>> = Lazy::new(|| {
    Arc::new(MovementRule::Step { offsets: ALL_DIRECTIONS.to_vec() })
});
static BACKWARD_STEP: Lazy<Arc<MovementRule>> = Lazy::new(|| {
    Arc::new(MovementRule::Step { offsets: vec![(0, -1)] })
});
static DIAGONAL_STEP: Lazy<Arc<MovementRule>> = Lazy::new(|| {
    Arc::new(MovementRule::Step { offsets: DIAGONAL.to_vec() })
});
static NULL: Lazy<Arc<MovementRule>> = Lazy::new(|| Arc::new(MovementRule::Null));

pub fn pawn() -> Arc<MovementRule> {
    Arc::clone(&PAWN)
}

pub fn knight() -> Arc<MovementRule> {
    Arc::clone(&KNIGHT)
}

pub fn bishop() -> Arc<MovementRule> {
    Arc::clone(&BISHOP)
}

pub fn rook() -> Arc<MovementRule> {
    Arc::clone(&ROOK)
}

pub fn queen() -> Arc<MovementRule> {
    Arc::clone(&QUEEN)
}

pub fn king() -> Arc<MovementRule> {
    Arc::clone(&KING)
}

pub fn backward_step() -> Arc<MovementRule> {
    Arc::clone(&BACKWARD_STEP)
}

pub fn diagonal_step() -> Arc<MovementRule> {
    Arc::clone(&DIAGONAL_STEP)
}

pub fn null() -> Arc<MovementRule> {
    Arc::clone(&NULL)
}

pub fn slide(directions: &[Offset], max_distance: i32) -> Arc<MovementRule> {
    Arc::new(MovementRule::Slide {
        directions: directions.to_vec(),
        max_distance,
        exact: false,
    })
}

/// Lands exactly `distance` squares away along each direction, path clear.
pub fn fixed_distance(directions: &[Offset], distance: i32) -> Arc<MovementRule> {
    Arc::new(MovementRule::Slide {
        directions: directions.to_vec(),
        max_distance: distance.max(1),
        exact: true,
    })
}

/// Rules a freshly placed piece of `piece_type` starts with.
pub fn standard_rules(piece_type: PieceType) -> Vec<Arc<MovementRule>> {
    match piece_type {
        PieceType::Pawn => vec![pawn()],
        PieceType::Knight => vec![knight()],
        PieceType::Bishop => vec![bishop()],
        PieceType::Rook => vec![rook()],
        PieceType::Queen => vec![queen()],
        PieceType::King => vec![king()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_board() -> Board {
        Board::new(8, 8)
    }

    fn pos(file: i32, rank: i32) -> Position {
        Position::new(file, rank)
    }

    #[test]
    fn rook_on_empty_board_reaches_fourteen_squares() {
        let board = empty_board();
        assert_eq!(rook().destinations(&board, pos(3, 3), Team::White).len(), 14);
    }

    #[test]
    fn slide_stops_on_enemy_and_includes_it() {
        let mut board = empty_board();
        board.place_piece(PieceType::Pawn, Team::Black, pos(0, 3)).unwrap();
        let moves = rook().destinations(&board, pos(0, 0), Team::White);
        let up_file: Vec<_> = moves.iter().filter(|p| p.file == 0).collect();
        assert_eq!(up_file, vec![&pos(0, 1), &pos(0, 2), &pos(0, 3)]);
    }

    #[test]
    fn slide_stops_before_friend_and_obstacle() {
        let mut board = empty_board();
        board.place_piece(PieceType::Pawn, Team::White, pos(0, 2)).unwrap();
        board.set_obstacle(pos(2, 0), true).unwrap();
        let moves = rook().destinations(&board, pos(0, 0), Team::White);
        assert_eq!(moves, [pos(0, 1), pos(1, 0)].into_iter().collect());
    }

    #[test]
    fn bounded_slide_truncates() {
        let board = empty_board();
        let rule = slide(&[(1, 0)], 2);
        assert_eq!(
            rule.destinations(&board, pos(0, 0), Team::White),
            [pos(1, 0), pos(2, 0)].into_iter().collect()
        );
    }

    #[test]
    fn exact_distance_requires_clear_path() {
        let mut board = empty_board();
        let rule = fixed_distance(&[(1, 0), (0, 1)], 3);
        assert_eq!(
            rule.destinations(&board, pos(0, 0), Team::White),
            [pos(3, 0), pos(0, 3)].into_iter().collect()
        );

        board.place_piece(PieceType::Pawn, Team::Black, pos(1, 0)).unwrap();
        board.set_obstacle(pos(0, 3), true).unwrap();
        assert!(rule.destinations(&board, pos(0, 0), Team::White).is_empty());
    }

    #[test]
    fn knight_jumps_over_pieces_but_not_onto_friends() {
        let mut board = empty_board();
        board.place_piece(PieceType::Pawn, Team::White, pos(0, 1)).unwrap();
        board.place_piece(PieceType::Pawn, Team::White, pos(2, 1)).unwrap();
        board.place_piece(PieceType::Pawn, Team::Black, pos(1, 2)).unwrap();
        let moves = knight().destinations(&board, pos(0, 0), Team::White);
        assert_eq!(moves, [pos(1, 2)].into_iter().collect());
    }

    #[test]
    fn knight_skips_obstacles() {
        let mut board = empty_board();
        board.set_obstacle(pos(2, 1), true).unwrap();
        let moves = knight().destinations(&board, pos(0, 0), Team::White);
        assert_eq!(moves, [pos(1, 2)].into_iter().collect());
    }

    #[test]
    fn pawn_pushes_and_captures_diagonally() {
        let mut board = empty_board();
        board.place_piece(PieceType::Knight, Team::Black, pos(5, 2)).unwrap();
        board.place_piece(PieceType::Knight, Team::White, pos(3, 2)).unwrap();
        let moves = pawn().destinations(&board, pos(4, 1), Team::White);
        assert_eq!(moves, [pos(4, 2), pos(4, 3), pos(5, 2)].into_iter().collect());
    }

    #[test]
    fn pawn_cannot_capture_forward() {
        let mut board = empty_board();
        board.place_piece(PieceType::Rook, Team::White, pos(4, 5)).unwrap();
        let moves = pawn().destinations(&board, pos(4, 6), Team::Black);
        assert!(moves.is_empty());
    }

    #[test]
    fn black_pawn_double_step_mirrors() {
        let board = empty_board();
        let moves = pawn().destinations(&board, pos(2, 6), Team::Black);
        assert_eq!(moves, [pos(2, 5), pos(2, 4)].into_iter().collect());
    }

    #[test]
    fn backward_step_is_team_relative() {
        let board = empty_board();
        assert_eq!(
            backward_step().destinations(&board, pos(3, 3), Team::White),
            [pos(3, 2)].into_iter().collect()
        );
        assert_eq!(
            backward_step().destinations(&board, pos(3, 3), Team::Black),
            [pos(3, 4)].into_iter().collect()
        );
    }

    #[test]
    fn null_rule_is_empty() {
        let board = empty_board();
        assert!(null().destinations(&board, pos(3, 3), Team::White).is_empty());
    }

    #[test]
    fn shared_instances_are_reused() {
        assert!(Arc::ptr_eq(&rook(), &rook()));
        assert!(Arc::ptr_eq(&standard_rules(PieceType::King)[0], &king()));
    }
}
