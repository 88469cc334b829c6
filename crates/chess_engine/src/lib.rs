pub mod ai;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod move_eval;
pub mod search;

pub use ai::{BossAI, BossAbility, BossTrigger, ChessAI, Decision, DecisionMaker, SpecialAction};
pub use config::{AiConfig, EvalWeights, PieceValues};
pub use error::EngineError;
pub use evaluation::{evaluate_position, Evaluator, PositionEvaluator, ScoreBreakdown};
pub use move_eval::MoveEvaluator;
pub use search::{SearchEngine, SearchEngineBuilder, SearchResult};
