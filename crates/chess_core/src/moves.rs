use std::fmt;

use crate::{PieceId, Position};

/// A candidate move. `score` is filled in by the search and is not part of
/// the move's identity.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub piece: Option<PieceId>,
    pub captured: Option<PieceId>,
    pub score: f32,
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from &&
        self.to == other.to &&
        self.piece == other.piece &&
        self.captured == other.captured
    }
}

impl Eq for Move {}

impl Move {
    pub fn new(from: Position, to: Position, piece: PieceId, captured: Option<PieceId>) -> Self {
        Self {
            from,
            to,
            piece: Some(piece),
            captured,
            score: 0.0,
        }
    }

    /// The "no move" sentinel returned when the side to move is stuck.
    pub fn none() -> Self {
        Self {
            from: Position::new(0, 0),
            to: Position::new(0, 0),
            piece: None,
            captured: None,
            score: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.piece.is_none()
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "(none)");
        }
        let sep = if self.is_capture() { 'x' } else { '-' };
        write!(f, "{}{}{}", self.from, sep, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_not_part_of_identity() {
        let a = Move::new(Position::new(0, 0), Position::new(0, 1), PieceId(3), None);
        let b = a.with_score(12.5);
        assert_eq!(a, b);
    }

    #[test]
    fn sentinel_has_no_piece() {
        let mv = Move::none();
        assert!(mv.is_none());
        assert_eq!(mv.to_string(), "(none)");
    }

    #[test]
    fn display_marks_captures() {
        let mv = Move::new(Position::new(0, 7), Position::new(5, 7), PieceId(1), Some(PieceId(2)));
        assert_eq!(mv.to_string(), "a8xf8");
    }
}
