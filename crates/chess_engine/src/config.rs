use std::time::Duration;

use chess_core::PieceType;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Multipliers applied to each evaluation sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub material: f32,
    pub positional: f32,
    pub king_safety: f32,
    pub mobility: f32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            material: 1.0,
            positional: 1.0,
            king_safety: 1.0,
            mobility: 1.0,
        }
    }
}

/// Material value per piece type, in pawns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceValues {
    pub pawn: f32,
    pub knight: f32,
    pub bishop: f32,
    pub rook: f32,
    pub queen: f32,
    pub king: f32,
}

impl Default for PieceValues {
    fn default() -> Self {
        Self {
            pawn: 1.0,
            knight: 3.0,
            bishop: 3.25,
            rook: 5.0,
            queen: 9.0,
            king: 100.0,
        }
    }
}

impl PieceValues {
    pub fn value(&self, piece_type: PieceType) -> f32 {
        match piece_type {
            PieceType::Pawn => self.pawn,
            PieceType::Knight => self.knight,
            PieceType::Bishop => self.bishop,
            PieceType::Rook => self.rook,
            PieceType::Queen => self.queen,
            PieceType::King => self.king,
        }
    }
}

/// Difficulty settings for one opponent. Authored as data, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Fixed search depth, or the deepest iteration when deepening.
    pub search_depth: u8,
    pub max_time_ms: u64,
    pub iterative_deepening: bool,
    pub weights: EvalWeights,
    /// Half-width of the uniform noise added to every evaluation.
    pub randomness: f32,
    pub seed: u64,
    pub piece_values: PieceValues,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            search_depth: 3,
            max_time_ms: 1000,
            iterative_deepening: true,
            weights: EvalWeights::default(),
            randomness: 0.05,
            seed: 0,
            piece_values: PieceValues::default(),
        }
    }
}

impl AiConfig {
    pub fn easy() -> Self {
        Self {
            search_depth: 1,
            max_time_ms: 250,
            iterative_deepening: false,
            randomness: 0.75,
            weights: EvalWeights {
                king_safety: 0.5,
                mobility: 0.5,
                ..EvalWeights::default()
            },
            ..Self::default()
        }
    }

    pub fn normal() -> Self {
        Self::default()
    }

    pub fn hard() -> Self {
        Self {
            search_depth: 6,
            max_time_ms: 2500,
            randomness: 0.0,
            weights: EvalWeights {
                king_safety: 1.5,
                ..EvalWeights::default()
            },
            ..Self::default()
        }
    }

    /// Parses a config; missing fields keep their defaults.
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }

    /// Checks the config before a search runs on it.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.search_depth == 0 {
            return Err(EngineError::InvalidConfig("search_depth must be at least 1".into()));
        }
        if self.iterative_deepening && self.max_time_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "max_time_ms must be positive when iterative deepening".into(),
            ));
        }

        let weights = [
            ("weights.material", self.weights.material),
            ("weights.positional", self.weights.positional),
            ("weights.king_safety", self.weights.king_safety),
            ("weights.mobility", self.weights.mobility),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() {
                return Err(EngineError::InvalidConfig(format!("{name} is not finite")));
            }
        }

        if !self.randomness.is_finite() || self.randomness < 0.0 {
            return Err(EngineError::InvalidConfig(
                "randomness must be a non-negative number".into(),
            ));
        }

        for piece_type in PieceType::ALL {
            let value = self.piece_values.value(piece_type);
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "piece value for {piece_type:?} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}
