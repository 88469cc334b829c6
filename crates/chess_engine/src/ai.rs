use std::time::Duration;

use chess_core::{Board, Move, PieceId, PieceType, Position, Team};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AiConfig;
use crate::error::EngineError;
use crate::evaluation::Evaluator;
use crate::search::{SearchEngine, SearchResult};

const BOSS_SEED_SALT: u64 = 0x5EED_B055; // Keeps trigger rolls apart from evaluation noise
const DEFAULT_BOSS_COOLDOWN: u32 = 3;    // Turns between special actions

/// Something a boss did to the board outside the normal rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecialAction {
    Summoned { piece: PieceId, piece_type: PieceType, at: Position },
    KingRetreated { from: Position, to: Position },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub chosen: Move,
    pub special: Option<SpecialAction>,
    pub search: SearchResult,
}

/// Anything that can choose a move for a team.
pub trait DecisionMaker {
    /// May alter `board` through special actions before choosing; the chosen
    /// move itself is not played.
    fn decide(&mut self, board: &mut Board, team: Team, budget: Duration) -> Result<Decision, EngineError>;
}

/// Standard opponent: a search engine driven by one difficulty config.
#[derive(Debug, Clone)]
pub struct ChessAI {
    engine: SearchEngine,
    last_result: Option<SearchResult>,
}

impl ChessAI {
    pub fn new(config: AiConfig) -> Result<Self, EngineError> {
        Ok(Self::with_engine(SearchEngine::new(config)?))
    }

    pub fn with_engine(engine: SearchEngine) -> Self {
        Self { engine, last_result: None }
    }

    pub fn config(&self) -> &AiConfig {
        self.engine.config()
    }

    pub fn last_result(&self) -> Option<&SearchResult> {
        self.last_result.as_ref()
    }

    /// Iterative deepening within `budget`, or a fixed-depth search when the
    /// config turns deepening off.
    pub fn search(&mut self, board: &Board, team: Team, budget: Duration) -> Result<SearchResult, EngineError> {
        let result = if self.engine.config().iterative_deepening {
            self.engine.iterative_deepening_search(board, team, budget)?
        } else {
            let depth = self.engine.config().search_depth;
            self.engine.depth_limited_search(board, team, depth)?
        };
        self.last_result = Some(result);
        Ok(result)
    }

    pub fn select_move(&mut self, board: &Board, team: Team, budget: Duration) -> Result<Move, EngineError> {
        let result = self.search(board, team, budget)?;
        info!(
            "{:?} plays {} (score {:.2}, depth {}, {} nodes, {:?})",
            team, result.best_move, result.score, result.depth, result.nodes, result.elapsed
        );
        Ok(result.best_move)
    }

    pub fn evaluate_position(&mut self, board: &Board, team: Team) -> f32 {
        self.engine.evaluator_mut().evaluate(board, team)
    }
}

impl DecisionMaker for ChessAI {
    fn decide(&mut self, board: &mut Board, team: Team, budget: Duration) -> Result<Decision, EngineError> {
        let chosen = self.select_move(board, team, budget)?;
        let search = self.last_result.unwrap_or(SearchResult {
            best_move: chosen,
            score: 0.0,
            depth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
        });
        Ok(Decision { chosen, special: None, search })
    }
}

/// When a boss considers its special action, judged on its own evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossTrigger {
    Always,
    /// Fires while the boss is losing by more than the threshold.
    BelowThreshold(f32),
    /// Fires with `chance` while the boss is ahead of the threshold.
    AboveThresholdWithChance { threshold: f32, chance: f64 },
}

impl BossTrigger {
    fn fires(&self, evaluation: f32, rng: &mut StdRng) -> bool {
        match *self {
            BossTrigger::Always => true,
            BossTrigger::BelowThreshold(threshold) => evaluation < threshold,
            BossTrigger::AboveThresholdWithChance { threshold, chance } => {
                // NaN or infinite chances never fire
                let chance = if chance.is_finite() { chance.clamp(0.0, 1.0) } else { 0.0 };
                evaluation > threshold && rng.gen_bool(chance)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossAbility {
    /// Places a new piece on the free square closest to the boss's king.
    SummonReinforcement(PieceType),
    /// Steps the king to the reachable empty square with the fewest attackers.
    KingRetreat,
}

/// A `ChessAI` with one special ability it may use before moving.
#[derive(Debug, Clone)]
pub struct BossAI {
    base: ChessAI,
    ability: BossAbility,
    trigger: BossTrigger,
    cooldown: u32,
    cooldown_left: u32,
    rng: StdRng,
}

impl BossAI {
    pub fn new(base: ChessAI, ability: BossAbility, trigger: BossTrigger) -> Self {
        let seed = base.config().seed ^ BOSS_SEED_SALT;
        Self {
            base,
            ability,
            trigger,
            cooldown: DEFAULT_BOSS_COOLDOWN,
            cooldown_left: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown = turns;
        self
    }

    pub fn base(&self) -> &ChessAI {
        &self.base
    }

    pub fn cooldown_left(&self) -> u32 {
        self.cooldown_left
    }

    /// Checks the trigger and, if it fires, applies the ability to `board`.
    pub fn try_special(&mut self, board: &mut Board, team: Team) -> Result<Option<SpecialAction>, EngineError> {
        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            return Ok(None);
        }

        let evaluation = self.base.evaluate_position(board, team);
        if !self.trigger.fires(evaluation, &mut self.rng) {
            return Ok(None);
        }

        let action = match self.ability {
            BossAbility::SummonReinforcement(piece_type) => summon_reinforcement(board, team, piece_type)?,
            BossAbility::KingRetreat => king_retreat(board, team)?,
        };
        match action {
            Some(action) => {
                info!("{:?} boss uses {:?}", team, action);
                self.cooldown_left = self.cooldown;
            }
            None => debug!("{:?} boss trigger fired but {:?} had no effect", team, self.ability),
        }
        Ok(action)
    }
}

impl DecisionMaker for BossAI {
    fn decide(&mut self, board: &mut Board, team: Team, budget: Duration) -> Result<Decision, EngineError> {
        let special = self.try_special(board, team)?;
        let decision = self.base.decide(board, team, budget)?;
        Ok(Decision { special, ..decision })
    }
}

fn summon_reinforcement(
    board: &mut Board,
    team: Team,
    piece_type: PieceType,
) -> Result<Option<SpecialAction>, EngineError> {
    let Some(king) = board.find_king(team).map(|king| king.position) else {
        return Ok(None);
    };

    let nearest = (0..board.height())
        .flat_map(|rank| (0..board.width()).map(move |file| Position::new(file, rank)))
        .filter(|&pos| board.is_free(pos))
        .min_by_key(|&pos| pos.distance(king));

    let Some(at) = nearest else {
        return Ok(None);
    };
    let piece = board.place_piece(piece_type, team, at)?;
    Ok(Some(SpecialAction::Summoned { piece, piece_type, at }))
}

fn king_retreat(board: &mut Board, team: Team) -> Result<Option<SpecialAction>, EngineError> {
    let Some((king_id, from)) = board.find_king(team).map(|king| (king.id, king.position)) else {
        return Ok(None);
    };
    let enemy = team.opposite();
    let current = board.attackers_of(from, enemy);
    if current == 0 {
        return Ok(None);
    }

    let mut best: Option<(Position, usize)> = None;
    for to in board.valid_destinations(king_id) {
        if !board.is_free(to) {
            continue;
        }
        let mut simulated = board.clone();
        simulated.move_piece(from, to)?;
        let attackers = simulated.attackers_of(to, enemy);
        if best.map_or(true, |(_, fewest)| attackers < fewest) {
            best = Some((to, attackers));
        }
    }

    match best {
        Some((to, attackers)) if attackers < current => {
            board.move_piece(from, to)?;
            Ok(Some(SpecialAction::KingRetreated { from, to }))
        }
        _ => Ok(None),
    }
}
