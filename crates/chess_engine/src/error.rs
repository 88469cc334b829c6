use chess_core::BoardError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("search engine has no evaluator")]
    MissingEvaluator,
    #[error("search engine has no configuration")]
    MissingConfig,
    #[error("invalid AI configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Board(#[from] BoardError),
}
