use std::fmt;
use std::sync::Arc;

use crate::rules::MovementRule;
use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    White,
    Black,
}

impl Team {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Team::White => Team::Black,
            Team::Black => Team::White,
        }
    }

    /// Rank direction this team advances in.
    pub const fn forward(self) -> i32 {
        match self {
            Team::White => 1,
            Team::Black => -1,
        }
    }

    pub const fn back_rank(self, height: i32) -> i32 {
        match self {
            Team::White => 0,
            Team::Black => height - 1,
        }
    }

    /// Rank the team's pawns start on (and double-step from).
    pub const fn pawn_rank(self, height: i32) -> i32 {
        match self {
            Team::White => 1,
            Team::Black => height - 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];
}

/// Stable arena identifier. Never reused within one board's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one attached rule on one piece, so that the exact instance a
/// mutation injected can be taken off again even when another source
/// attached an equal rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleHandle(pub u32);

#[derive(Debug, Clone)]
pub struct RuleSlot {
    pub handle: RuleHandle,
    pub rule: Arc<MovementRule>,
}

#[derive(Debug, Clone)]
pub struct Piece {
    pub id: PieceId,
    pub piece_type: PieceType,
    pub team: Team,
    pub position: Position,
    rules: Vec<RuleSlot>,
    next_handle: u32,
    mutation_count: u32,
}

impl Piece {
    pub fn new(id: PieceId, piece_type: PieceType, team: Team, position: Position) -> Self {
        Self {
            id,
            piece_type,
            team,
            position,
            rules: Vec::new(),
            next_handle: 0,
            mutation_count: 0,
        }
    }

    pub fn rules(&self) -> &[RuleSlot] {
        &self.rules
    }

    pub fn rule_handles(&self) -> Vec<RuleHandle> {
        self.rules.iter().map(|slot| slot.handle).collect()
    }

    pub fn add_rule(&mut self, rule: Arc<MovementRule>) -> RuleHandle {
        let handle = RuleHandle(self.next_handle);
        self.next_handle += 1;
        self.rules.push(RuleSlot { handle, rule });
        handle
    }

    /// Re-inserts a previously removed slot under its original handle.
    pub fn restore_rule(&mut self, slot: RuleSlot) {
        self.next_handle = self.next_handle.max(slot.handle.0 + 1);
        self.rules.push(slot);
    }

    pub fn remove_rule(&mut self, handle: RuleHandle) -> Option<RuleSlot> {
        let index = self.rules.iter().position(|slot| slot.handle == handle)?;
        Some(self.rules.remove(index))
    }

    pub fn take_rules(&mut self) -> Vec<RuleSlot> {
        std::mem::take(&mut self.rules)
    }

    pub fn has_mutations(&self) -> bool {
        self.mutation_count > 0
    }

    pub fn mutation_count(&self) -> u32 {
        self.mutation_count
    }

    pub(crate) fn mark_mutated(&mut self) {
        self.mutation_count += 1;
    }

    pub(crate) fn unmark_mutated(&mut self) {
        self.mutation_count = self.mutation_count.saturating_sub(1);
    }
}
