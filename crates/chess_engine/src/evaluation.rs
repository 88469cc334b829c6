use chess_core::{Board, Piece, PieceType, Position, Team};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AiConfig, EvalWeights, PieceValues};

// Scores are measured in pawns (1.0 = one pawn)
pub const MUTATION_MULTIPLIER: f32 = 1.2;   // Mutated pieces are worth a bit more
pub const CENTER_BONUS: f32 = 0.3;          // Per piece on one of the four centre squares
pub const DEVELOPMENT_BONUS: f32 = 0.1;     // Per non-king piece off its back rank
pub const KING_SHIELD_BONUS: f32 = 0.15;    // Per friendly piece next to the king
pub const KING_ATTACKED_PENALTY: f32 = 0.5; // King currently on an attacked square
pub const MOBILITY_SCALE: f32 = 0.1;        // Per available destination

/// Static evaluation of a board for one team. Positive favours `team`.
pub trait Evaluator {
    fn evaluate(&mut self, board: &Board, team: Team) -> f32;

    fn piece_value(&self, piece_type: PieceType) -> f32;

    /// Restarts the noise stream, if the evaluator has one.
    fn reseed(&mut self, _seed: u64) {}
}

/// Unweighted sub-scores, each already "team minus opponent".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub material: f32,
    pub positional: f32,
    pub king_safety: f32,
    pub mobility: f32,
}

impl ScoreBreakdown {
    pub fn weighted_total(&self, weights: &EvalWeights) -> f32 {
        self.material * weights.material
            + self.positional * weights.positional
            + self.king_safety * weights.king_safety
            + self.mobility * weights.mobility
    }
}

#[derive(Debug, Clone)]
pub struct PositionEvaluator {
    weights: EvalWeights,
    piece_values: PieceValues,
    randomness: f32,
    rng: StdRng,
}

impl PositionEvaluator {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            weights: config.weights,
            piece_values: config.piece_values,
            randomness: config.randomness,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    pub fn breakdown(&self, board: &Board, team: Team) -> ScoreBreakdown {
        ScoreBreakdown {
            material: material_score(board, team, &self.piece_values),
            positional: positional_score(board, team),
            king_safety: king_safety_score(board, team),
            mobility: mobility_score(board, team),
        }
    }

    fn noise(&mut self) -> f32 {
        if self.randomness > 0.0 {
            self.rng.gen_range(-self.randomness..=self.randomness)
        } else {
            0.0
        }
    }
}

impl Evaluator for PositionEvaluator {
    fn evaluate(&mut self, board: &Board, team: Team) -> f32 {
        let score = self.breakdown(board, team).weighted_total(&self.weights);
        score + self.noise()
    }

    fn piece_value(&self, piece_type: PieceType) -> f32 {
        self.piece_values.value(piece_type)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// One-shot evaluation with a fresh evaluator built from `config`.
pub fn evaluate_position(board: &Board, team: Team, config: &AiConfig) -> f32 {
    PositionEvaluator::new(config).evaluate(board, team)
}

/// The four squares around the middle of the board. Narrow boards yield fewer.
pub fn center_squares(board: &Board) -> Vec<Position> {
    let (w, h) = (board.width(), board.height());
    let mut squares = Vec::with_capacity(4);
    for rank in [h / 2 - 1, h / 2] {
        for file in [w / 2 - 1, w / 2] {
            let pos = Position::new(file, rank);
            if board.is_position_valid(pos) && !squares.contains(&pos) {
                squares.push(pos);
            }
        }
    }
    squares
}

fn piece_material(piece: &Piece, values: &PieceValues) -> f32 {
    let base = values.value(piece.piece_type);
    if piece.has_mutations() {
        base * MUTATION_MULTIPLIER
    } else {
        base
    }
}

pub fn material_score(board: &Board, team: Team, values: &PieceValues) -> f32 {
    board.pieces().fold(0.0, |acc, piece| {
        let value = piece_material(piece, values);
        if piece.team == team { acc + value } else { acc - value }
    })
}

pub fn positional_score(board: &Board, team: Team) -> f32 {
    let center = center_squares(board);
    let side = |side: Team| -> f32 {
        let back_rank = side.back_rank(board.height());
        board
            .pieces_by_team(side)
            .map(|piece| {
                let mut bonus = 0.0;
                if center.contains(&piece.position) {
                    bonus += CENTER_BONUS;
                }
                if piece.piece_type != PieceType::King && piece.position.rank != back_rank {
                    bonus += DEVELOPMENT_BONUS;
                }
                bonus
            })
            .sum()
    };
    side(team) - side(team.opposite())
}

pub fn king_safety_score(board: &Board, team: Team) -> f32 {
    let side = |side: Team| -> f32 {
        let Some(king) = board.find_king(side) else {
            return 0.0;
        };
        let shield = board
            .pieces_by_team(side)
            .filter(|piece| piece.id != king.id && piece.position.is_adjacent(king.position))
            .count() as f32;
        let mut score = shield * KING_SHIELD_BONUS;
        if board.is_square_attacked(king.position, side.opposite()) {
            score -= KING_ATTACKED_PENALTY;
        }
        score
    };
    side(team) - side(team.opposite())
}

pub fn mobility_score(board: &Board, team: Team) -> f32 {
    let own = board.move_count(team) as f32;
    let theirs = board.move_count(team.opposite()) as f32;
    (own - theirs) * MOBILITY_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{MutationCatalog, MutationId, MutationManager};

    fn quiet_config() -> AiConfig {
        AiConfig { randomness: 0.0, ..AiConfig::default() }
    }

    fn pos(file: i32, rank: i32) -> Position {
        Position::new(file, rank)
    }

    #[test]
    fn starting_position_is_level() {
        let board = Board::standard();
        let config = quiet_config();
        assert!(evaluate_position(&board, Team::White, &config).abs() < 1e-4);
        assert!(evaluate_position(&board, Team::Black, &config).abs() < 1e-4);
    }

    #[test]
    fn material_counts_mutations() {
        let mut board = Board::new(8, 8);
        let rook = board.place_piece(PieceType::Rook, Team::White, pos(0, 0)).unwrap();
        board.place_piece(PieceType::Rook, Team::Black, pos(7, 7)).unwrap();
        let values = PieceValues::default();
        assert!(material_score(&board, Team::White, &values).abs() < 1e-6);

        let catalog = MutationCatalog::standard();
        let mut manager = MutationManager::new();
        let leap = catalog.get(&MutationId::from("knight_leap")).unwrap();
        manager.apply_mutation(&mut board, rook, leap).unwrap();

        let expected = 5.0 * MUTATION_MULTIPLIER - 5.0;
        assert!((material_score(&board, Team::White, &values) - expected).abs() < 1e-5);
        assert!((material_score(&board, Team::Black, &values) + expected).abs() < 1e-5);
    }

    #[test]
    fn center_squares_on_odd_boards() {
        assert_eq!(
            center_squares(&Board::new(8, 8)),
            vec![pos(3, 3), pos(4, 3), pos(3, 4), pos(4, 4)]
        );
        assert_eq!(center_squares(&Board::new(1, 1)), vec![pos(0, 0)]);
    }

    #[test]
    fn attacked_king_costs_safety() {
        let mut board = Board::new(8, 8);
        board.place_piece(PieceType::King, Team::White, pos(0, 0)).unwrap();
        board.place_piece(PieceType::King, Team::Black, pos(7, 7)).unwrap();
        assert!(king_safety_score(&board, Team::White).abs() < 1e-6);

        board.place_piece(PieceType::Rook, Team::Black, pos(0, 5)).unwrap();
        let score = king_safety_score(&board, Team::White);
        assert!((score + KING_ATTACKED_PENALTY).abs() < 1e-6);
        assert!((king_safety_score(&board, Team::Black) - KING_ATTACKED_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn noise_stays_within_bounds_and_repeats_per_seed() {
        let board = Board::standard();
        let config = AiConfig { randomness: 0.25, seed: 42, ..AiConfig::default() };

        let mut first = PositionEvaluator::new(&config);
        let a: Vec<f32> = (0..20).map(|_| first.evaluate(&board, Team::White)).collect();
        for score in &a {
            assert!(score.abs() <= 0.25 + 1e-4);
        }

        first.reseed(42);
        let b: Vec<f32> = (0..20).map(|_| first.evaluate(&board, Team::White)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn weights_scale_sub_scores() {
        let mut board = Board::new(8, 8);
        board.place_piece(PieceType::Queen, Team::White, pos(3, 3)).unwrap();
        board.place_piece(PieceType::Pawn, Team::Black, pos(0, 6)).unwrap();

        let mut config = quiet_config();
        config.weights = EvalWeights { material: 1.0, positional: 0.0, king_safety: 0.0, mobility: 0.0 };
        let pure_material = evaluate_position(&board, Team::White, &config);
        assert!((pure_material - 8.0).abs() < 1e-5);

        config.weights.material = 0.0;
        assert!(evaluate_position(&board, Team::White, &config).abs() < 1e-6);
    }
}
