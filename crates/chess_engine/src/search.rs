use std::cmp::Ordering;
use std::time::{Duration, Instant};

use chess_core::{Board, Move, Team};
use log::{debug, trace};

use crate::config::AiConfig;
use crate::error::EngineError;
use crate::evaluation::{Evaluator, PositionEvaluator};
use crate::move_eval::MoveEvaluator;

// Time management for iterative deepening
const OVERRUN_LIMIT: f32 = 1.5;                        // Projected finish may not pass budget × this
const MIN_GROWTH: f32 = 8.0;                           // Floor on the assumed depth-to-depth cost ratio
const MAX_GROWTH: f32 = 40.0;                          // Cap on the assumed depth-to-depth cost ratio
const MIN_MEASURABLE: Duration = Duration::from_micros(200); // Shorter depths give no usable ratio

/// Outcome of one top-level search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// `Move::none()` when the side to move has no moves.
    pub best_move: Move,
    pub score: f32,
    /// Deepest fully completed depth.
    pub depth: u8,
    pub nodes: u64,
    pub elapsed: Duration,
}

/// Minimax with alpha-beta pruning over cloned boards. The root team
/// maximises, the opponent minimises, and every leaf is scored from the
/// root team's point of view.
#[derive(Debug, Clone)]
pub struct SearchEngine<E: Evaluator = PositionEvaluator> {
    config: AiConfig,
    evaluator: E,
    move_evaluator: MoveEvaluator,
    nodes_evaluated: u64,
}

#[derive(Debug)]
pub struct SearchEngineBuilder<E: Evaluator> {
    config: Option<AiConfig>,
    evaluator: Option<E>,
    move_evaluator: MoveEvaluator,
}

impl<E: Evaluator> Default for SearchEngineBuilder<E> {
    fn default() -> Self {
        Self {
            config: None,
            evaluator: None,
            move_evaluator: MoveEvaluator::default(),
        }
    }
}

impl<E: Evaluator> SearchEngineBuilder<E> {
    pub fn config(mut self, config: AiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn evaluator(mut self, evaluator: E) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn move_evaluator(mut self, move_evaluator: MoveEvaluator) -> Self {
        self.move_evaluator = move_evaluator;
        self
    }

    pub fn build(self) -> Result<SearchEngine<E>, EngineError> {
        let evaluator = self.evaluator.ok_or(EngineError::MissingEvaluator)?;
        let config = self.config.ok_or(EngineError::MissingConfig)?;
        config.validate()?;
        Ok(SearchEngine {
            config,
            evaluator,
            move_evaluator: self.move_evaluator,
            nodes_evaluated: 0,
        })
    }
}

impl SearchEngine<PositionEvaluator> {
    /// Engine with the standard evaluator built from `config`.
    pub fn new(config: AiConfig) -> Result<Self, EngineError> {
        let evaluator = PositionEvaluator::new(&config);
        SearchEngine::builder().config(config).evaluator(evaluator).build()
    }
}

impl<E: Evaluator> SearchEngine<E> {
    pub fn builder() -> SearchEngineBuilder<E> {
        SearchEngineBuilder::default()
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn nodes_evaluated(&self) -> u64 {
        self.nodes_evaluated
    }

    pub fn reset_counters(&mut self) {
        self.nodes_evaluated = 0;
    }

    /// Runs a single search to exactly `depth` plies.
    pub fn depth_limited_search(
        &mut self,
        board: &Board,
        team: Team,
        depth: u8,
    ) -> Result<SearchResult, EngineError> {
        self.begin_search()?;
        let depth = depth.max(1);
        let start = Instant::now();
        let (best_move, score) = self.search_root(board, team, depth)?;

        let result = SearchResult {
            best_move,
            score,
            depth,
            nodes: self.nodes_evaluated,
            elapsed: start.elapsed(),
        };
        debug!(
            "depth {} search for {:?}: {} ({:.2}) after {} nodes",
            depth, team, result.best_move, score, result.nodes
        );
        Ok(result)
    }

    /// Searches depth 1, 2, ... up to the configured depth, keeping the
    /// result of the deepest depth that finished. A depth is never aborted
    /// once started, so a new one only starts while its projected finish
    /// stays inside the overrun limit. The projection multiplies the last
    /// depth's time by the observed growth, never less than the branching
    /// factor of the position.
    pub fn iterative_deepening_search(
        &mut self,
        board: &Board,
        team: Team,
        budget: Duration,
    ) -> Result<SearchResult, EngineError> {
        self.begin_search()?;
        let start = Instant::now();
        let limit = budget.mul_f32(OVERRUN_LIMIT);
        let max_depth = self.config.search_depth;

        let mut completed: Option<SearchResult> = None;
        let mut last_duration: Option<Duration> = None;
        let floor = growth_floor(board, team);
        let mut growth = floor;

        for depth in 1..=max_depth {
            if completed.is_some() {
                let elapsed = start.elapsed();
                if elapsed >= budget {
                    debug!("budget spent after depth {}", depth - 1);
                    break;
                }
                if let Some(last) = last_duration {
                    let projected = elapsed + last.mul_f32(growth);
                    if projected > limit {
                        debug!(
                            "skipping depth {}: projected {:?} exceeds {:?}",
                            depth, projected, limit
                        );
                        break;
                    }
                }
            }

            let depth_start = Instant::now();
            let (best_move, score) = self.search_root(board, team, depth)?;
            let took = depth_start.elapsed();

            if let Some(last) = last_duration {
                if last >= MIN_MEASURABLE {
                    let ratio = took.as_secs_f32() / last.as_secs_f32();
                    growth = ratio.clamp(floor, MAX_GROWTH);
                }
            }
            last_duration = Some(took);

            trace!("depth {} finished in {:?}: {} ({:.2})", depth, took, best_move, score);
            completed = Some(SearchResult {
                best_move,
                score,
                depth,
                nodes: self.nodes_evaluated,
                elapsed: start.elapsed(),
            });

            if best_move.is_none() {
                break;
            }
        }

        let result = completed.ok_or_else(|| {
            EngineError::InvalidConfig("search_depth must be at least 1".into())
        })?;
        debug!(
            "iterative deepening for {:?}: {} ({:.2}) at depth {} after {} nodes in {:?}",
            team, result.best_move, result.score, result.depth, result.nodes, result.elapsed
        );
        Ok(result)
    }

    fn begin_search(&mut self) -> Result<(), EngineError> {
        self.config.validate()?;
        self.reset_counters();
        self.evaluator.reseed(self.config.seed);
        Ok(())
    }

    /// Root moves ordered by the move evaluator, best first. Equal scores
    /// keep generation order. Each move carries its ordering score.
    fn ordered_root_moves(&mut self, board: &Board, team: Team) -> Result<Vec<Move>, EngineError> {
        let mut scored = Vec::new();
        for mv in board.all_moves(team) {
            let score = self.move_evaluator.evaluate_move(&mut self.evaluator, board, &mv)?;
            scored.push(mv.with_score(score));
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }

    /// Captures first, most valuable victim first; quiet moves keep
    /// generation order.
    fn ordered_moves(&self, board: &Board, team: Team) -> Vec<Move> {
        let mut moves = board.all_moves(team);
        let victim_value = |mv: &Move| -> f32 {
            mv.captured
                .and_then(|id| board.piece(id))
                .map_or(f32::NEG_INFINITY, |victim| self.evaluator.piece_value(victim.piece_type))
        };
        moves.sort_by(|a, b| victim_value(b).total_cmp(&victim_value(a)));
        moves
    }

    fn search_root(&mut self, board: &Board, team: Team, depth: u8) -> Result<(Move, f32), EngineError> {
        self.nodes_evaluated += 1;
        let moves = self.ordered_root_moves(board, team)?;
        if moves.is_empty() {
            let score = self.evaluator.evaluate(board, team);
            return Ok((Move::none().with_score(score), score));
        }

        let mut alpha = f32::NEG_INFINITY;
        let beta = f32::INFINITY;
        let mut best: Option<Move> = None;

        for mv in moves {
            let mut child = board.clone();
            child.apply_move(&mv)?;
            let score = self.minimax(&child, depth - 1, alpha, beta, team.opposite(), team)?;

            // strictly better only: the first of equal moves is kept
            if best.map_or(true, |b| score.total_cmp(&b.score) == Ordering::Greater) {
                best = Some(mv.with_score(score));
            }
            alpha = alpha.max(score);
        }

        let best = best.unwrap_or_else(Move::none);
        Ok((best, best.score))
    }

    fn minimax(
        &mut self,
        board: &Board,
        depth: u8,
        mut alpha: f32,
        mut beta: f32,
        to_move: Team,
        root: Team,
    ) -> Result<f32, EngineError> {
        self.nodes_evaluated += 1;
        if depth == 0 {
            return Ok(self.evaluator.evaluate(board, root));
        }

        let moves = self.ordered_moves(board, to_move);
        if moves.is_empty() {
            return Ok(self.evaluator.evaluate(board, root));
        }

        let maximizing = to_move == root;
        let mut value = if maximizing { f32::NEG_INFINITY } else { f32::INFINITY };

        for mv in moves {
            let mut child = board.clone();
            child.apply_move(&mv)?;
            let score = self.minimax(&child, depth - 1, alpha, beta, to_move.opposite(), root)?;

            if maximizing {
                value = value.max(score);
                alpha = alpha.max(value);
            } else {
                value = value.min(score);
                beta = beta.min(value);
            }
            if alpha >= beta {
                break;
            }
        }
        Ok(value)
    }
}

/// Lowest cost ratio assumed between consecutive depths: the larger of
/// the two sides' move counts, within `MIN_GROWTH..=MAX_GROWTH`.
fn growth_floor(board: &Board, team: Team) -> f32 {
    let branching = board.move_count(team).max(board.move_count(team.opposite()));
    (branching as f32).clamp(MIN_GROWTH, MAX_GROWTH)
}
