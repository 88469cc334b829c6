use chess_core::{Board, BoardError, Move};

use crate::error::EngineError;
use crate::evaluation::{center_squares, Evaluator};

pub const CAPTURE_FRACTION: f32 = 0.5;   // Share of the victim's value credited on top
pub const CENTER_MOVE_BONUS: f32 = 0.2;  // Landing on a centre square
pub const FORWARD_BONUS: f32 = 0.05;     // Per rank advanced toward the enemy

/// Scores a candidate move by simulating it on a copy of the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvaluator {
    pub capture_fraction: f32,
    pub center_bonus: f32,
    pub forward_bonus: f32,
}

impl Default for MoveEvaluator {
    fn default() -> Self {
        Self {
            capture_fraction: CAPTURE_FRACTION,
            center_bonus: CENTER_MOVE_BONUS,
            forward_bonus: FORWARD_BONUS,
        }
    }
}

impl MoveEvaluator {
    /// Evaluation of the resulting position for the mover, plus tactical
    /// bonuses. `board` is left untouched.
    pub fn evaluate_move<E: Evaluator + ?Sized>(
        &self,
        evaluator: &mut E,
        board: &Board,
        mv: &Move,
    ) -> Result<f32, EngineError> {
        let mover = board
            .get_piece_at(mv.from)?
            .ok_or(BoardError::EmptySquare(mv.from))?;
        let team = mover.team;

        let mut simulated = board.clone();
        let captured = simulated.apply_move(mv)?;

        let mut score = evaluator.evaluate(&simulated, team);
        if let Some(victim) = captured {
            score += self.capture_fraction * evaluator.piece_value(victim.piece_type);
        }
        if center_squares(board).contains(&mv.to) {
            score += self.center_bonus;
        }
        let advance = (mv.to.rank - mv.from.rank) * team.forward();
        if advance > 0 {
            score += advance as f32 * self.forward_bonus;
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::evaluation::PositionEvaluator;
    use chess_core::{PieceType, Position, Team};

    fn pos(file: i32, rank: i32) -> Position {
        Position::new(file, rank)
    }

    fn evaluator() -> PositionEvaluator {
        PositionEvaluator::new(&AiConfig { randomness: 0.0, ..AiConfig::default() })
    }

    #[test]
    fn capture_beats_quiet_move() {
        let mut board = Board::new(8, 8);
        let rook = board.place_piece(PieceType::Rook, Team::White, pos(0, 0)).unwrap();
        let knight = board.place_piece(PieceType::Knight, Team::Black, pos(0, 6)).unwrap();
        let mut eval = evaluator();
        let scorer = MoveEvaluator::default();

        let capture = Move::new(pos(0, 0), pos(0, 6), rook, Some(knight));
        let quiet = Move::new(pos(0, 0), pos(1, 0), rook, None);
        let capture_score = scorer.evaluate_move(&mut eval, &board, &capture).unwrap();
        let quiet_score = scorer.evaluate_move(&mut eval, &board, &quiet).unwrap();
        assert!(capture_score > quiet_score + 3.0);
    }

    #[test]
    fn board_is_not_modified() {
        let board = Board::standard();
        let pawn = board.get_piece_at(pos(4, 1)).unwrap().unwrap().id;
        let mv = Move::new(pos(4, 1), pos(4, 3), pawn, None);
        MoveEvaluator::default()
            .evaluate_move(&mut evaluator(), &board, &mv)
            .unwrap();
        assert_eq!(board.get_piece_at(pos(4, 1)).unwrap().map(|p| p.id), Some(pawn));
        assert!(board.get_piece_at(pos(4, 3)).unwrap().is_none());
    }

    #[test]
    fn empty_origin_is_an_error() {
        let board = Board::new(8, 8);
        let mv = Move::none();
        let result = MoveEvaluator::default().evaluate_move(&mut evaluator(), &board, &mv);
        assert!(matches!(result, Err(EngineError::Board(BoardError::EmptySquare(_)))));
    }

    #[test]
    fn forward_progress_is_rewarded_for_black_too() {
        let mut board = Board::new(8, 8);
        let rook = board.place_piece(PieceType::Rook, Team::Black, pos(0, 7)).unwrap();
        let scorer = MoveEvaluator { capture_fraction: 0.0, center_bonus: 0.0, forward_bonus: 1.0 };
        let mut eval = evaluator();

        let resulting = |to: Position| {
            let mut after = board.clone();
            after.move_piece(pos(0, 7), to).unwrap();
            after
        };

        let down = Move::new(pos(0, 7), pos(0, 4), rook, None);
        let score = scorer.evaluate_move(&mut eval, &board, &down).unwrap();
        let base = eval.evaluate(&resulting(pos(0, 4)), Team::Black);
        assert!((score - base - 3.0).abs() < 1e-5);

        let across = Move::new(pos(0, 7), pos(3, 7), rook, None);
        let score = scorer.evaluate_move(&mut eval, &board, &across).unwrap();
        let base = eval.evaluate(&resulting(pos(3, 7)), Team::Black);
        assert!((score - base).abs() < 1e-5);
    }
}
