// Core rules: board, pieces, movement rules and runtime mutations
pub mod board;
pub mod moves;
pub mod mutation;
pub mod piece;
pub mod position;
pub mod rules;

// Re-export main types for convenience
pub use board::{Board, BoardError, Cell};
pub use moves::Move;
pub use mutation::{Mutation, MutationCatalog, MutationError, MutationId, MutationManager};
pub use piece::{Piece, PieceId, PieceType, RuleHandle, Team};
pub use position::Position;
pub use rules::MovementRule;
