use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use chess_core::{Board, MutationCatalog, MutationManager, PieceType, Team};
use chess_engine::{AiConfig, BossAI, BossAbility, BossTrigger, ChessAI, DecisionMaker};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Difficulty {
    Easy,
    Normal,
    Hard,
}

/// Self-play between two engines on a board whose pieces carry random mutations.
#[derive(Debug, Parser)]
#[command(name = "mutation-chess", version)]
struct Args {
    /// Half-moves to play before stopping.
    #[arg(long, default_value_t = 40)]
    plies: u32,

    #[arg(long, value_enum, default_value_t = Difficulty::Normal)]
    difficulty: Difficulty,

    /// JSON file with an AI config; overrides --difficulty.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    depth: Option<u8>,

    /// Thinking time per move in milliseconds.
    #[arg(long)]
    time_ms: Option<u64>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Random mutations handed to each side before the game.
    #[arg(long, default_value_t = 2)]
    mutations: usize,

    /// Black plays as a boss that summons pawns when behind.
    #[arg(long)]
    boss: bool,
}

fn load_config(args: &Args) -> Result<AiConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => AiConfig::load_from_json(&std::fs::read_to_string(path)?)?,
        None => match args.difficulty {
            Difficulty::Easy => AiConfig::easy(),
            Difficulty::Normal => AiConfig::normal(),
            Difficulty::Hard => AiConfig::hard(),
        },
    };
    if let Some(depth) = args.depth {
        config.search_depth = depth;
    }
    if let Some(time_ms) = args.time_ms {
        config.max_time_ms = time_ms;
    }
    config.seed = args.seed;
    config.validate()?;
    Ok(config)
}

fn hand_out_mutations(
    board: &mut Board,
    manager: &mut MutationManager,
    catalog: &MutationCatalog,
    per_team: usize,
    rng: &mut StdRng,
) {
    for team in [Team::White, Team::Black] {
        let mut candidates: Vec<_> = board
            .pieces_by_team(team)
            .map(|piece| (piece.id, piece.piece_type))
            .collect();
        candidates.shuffle(rng);

        for (id, piece_type) in candidates.into_iter().take(per_team) {
            let options: Vec<_> = catalog.compatible_with(piece_type).cloned().collect();
            let Some(mutation) = options.choose(rng) else {
                continue;
            };
            match manager.apply_mutation(board, id, mutation) {
                Ok(()) => info!("{:?} {:?} {} gains {}", team, piece_type, id, mutation.name),
                Err(err) => warn!("could not mutate {}: {}", id, err),
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    let budget = Duration::from_millis(config.max_time_ms);

    let mut board = Board::standard();
    let mut manager = MutationManager::new();
    let catalog = MutationCatalog::standard();
    let mut rng = StdRng::seed_from_u64(args.seed);
    hand_out_mutations(&mut board, &mut manager, &catalog, args.mutations, &mut rng);

    let mut white: Box<dyn DecisionMaker> = Box::new(ChessAI::new(config.clone())?);
    let mut black: Box<dyn DecisionMaker> = if args.boss {
        let base = ChessAI::new(config.clone())?;
        Box::new(BossAI::new(
            base,
            BossAbility::SummonReinforcement(PieceType::Pawn),
            BossTrigger::BelowThreshold(-2.0),
        ))
    } else {
        Box::new(ChessAI::new(config)?)
    };

    let mut team = Team::White;
    for ply in 1..=args.plies {
        if board.find_king(team).is_none() {
            println!("{:?} has lost its king", team);
            break;
        }

        let player = match team {
            Team::White => white.as_mut(),
            Team::Black => black.as_mut(),
        };
        let decision = player.decide(&mut board, team, budget)?;
        if let Some(special) = decision.special {
            println!("{:>3}. {:?} special: {:?}", ply, team, special);
        }
        if decision.chosen.is_none() {
            println!("{:?} has no moves", team);
            break;
        }

        let outcome = manager.perform_move(&mut board, &decision.chosen)?;
        manager.end_turn(&mut board);
        match outcome.captured {
            Some(victim) => println!(
                "{:>3}. {:?} {} takes {:?} (score {:.2}, depth {})",
                ply, team, decision.chosen, victim.piece_type, decision.search.score, decision.search.depth
            ),
            None => println!(
                "{:>3}. {:?} {} (score {:.2}, depth {})",
                ply, team, decision.chosen, decision.search.score, decision.search.depth
            ),
        }
        team = team.opposite();
    }
    Ok(())
}
