use chess_core::{Board, MutationCatalog, MutationManager, PieceType, Position, Team};
use chess_engine::{evaluate_position, AiConfig, Evaluator, PositionEvaluator};
use proptest::prelude::*;

fn piece_type() -> impl Strategy<Value = PieceType> {
    prop::sample::select(PieceType::ALL.to_vec())
}

fn placement() -> impl Strategy<Value = (PieceType, bool, i32, i32)> {
    (piece_type(), any::<bool>(), 0..8i32, 0..8i32)
}

fn build(placements: &[(PieceType, bool, i32, i32)], mutate: &[usize]) -> Board {
    let mut board = Board::new(8, 8);
    let mut ids = Vec::new();
    for &(piece_type, white, file, rank) in placements {
        let team = if white { Team::White } else { Team::Black };
        if let Ok(id) = board.place_piece(piece_type, team, Position::new(file, rank)) {
            ids.push(id);
        }
    }

    let catalog = MutationCatalog::standard();
    let mut manager = MutationManager::new();
    for &index in mutate {
        let Some(&id) = ids.get(index % ids.len().max(1)) else { continue };
        let Some(piece_type) = board.piece(id).map(|p| p.piece_type) else { continue };
        if let Some(mutation) = catalog.compatible_with(piece_type).next() {
            let mutation = mutation.clone();
            let _ = manager.apply_mutation(&mut board, id, &mutation);
        }
    }
    board
}

proptest! {
    #[test]
    fn evaluation_is_antisymmetric_without_noise(
        placements in prop::collection::vec(placement(), 0..14),
        mutate in prop::collection::vec(any::<usize>(), 0..4),
    ) {
        let board = build(&placements, &mutate);
        let config = AiConfig { randomness: 0.0, ..AiConfig::default() };
        let white = evaluate_position(&board, Team::White, &config);
        let black = evaluate_position(&board, Team::Black, &config);
        prop_assert!((white + black).abs() < 1e-3, "white {} black {}", white, black);
    }

    #[test]
    fn noise_never_exceeds_the_configured_bound(
        placements in prop::collection::vec(placement(), 0..10),
        seed in any::<u64>(),
    ) {
        let board = build(&placements, &[]);
        let quiet = AiConfig { randomness: 0.0, ..AiConfig::default() };
        let noisy = AiConfig { randomness: 0.4, seed, ..AiConfig::default() };

        let base = evaluate_position(&board, Team::White, &quiet);
        let mut evaluator = PositionEvaluator::new(&noisy);
        for _ in 0..5 {
            let score = evaluator.evaluate(&board, Team::White);
            prop_assert!((score - base).abs() <= 0.4 + 1e-3);
        }
    }
}

#[test]
fn extra_material_is_preferred() {
    let config = AiConfig { randomness: 0.0, ..AiConfig::default() };
    let board = Board::standard();
    let mut up_a_knight = board.clone();
    up_a_knight.remove_piece(Position::new(1, 7)).unwrap();

    let level = evaluate_position(&board, Team::White, &config);
    let ahead = evaluate_position(&up_a_knight, Team::White, &config);
    assert!(ahead > level + 2.0);
}
