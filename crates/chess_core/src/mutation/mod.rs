//! Runtime mutations: named transformations that change how one piece
//! moves or behaves.
//!
//! A [`Mutation`] is a shared definition and holds no per-piece data. Every
//! attachment gets its own [`MutationState`], owned by the
//! [`MutationManager`] and keyed by piece id. Hooks only ever see the state
//! of the attachment they run for.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::board::{Board, BoardError};
use crate::piece::RuleHandle;
use crate::rules::MovementRule;
use crate::{Move, Piece, PieceId, PieceType};

mod catalog;
pub mod effects;
mod manager;
mod state;

pub use catalog::MutationCatalog;
pub use manager::{MoveOutcome, MutationManager};
pub use state::{MutationState, StateValue};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("mutation {mutation} cannot attach to a {piece_type:?}")]
    Incompatible {
        mutation: MutationId,
        piece_type: PieceType,
    },
    #[error("mutation {mutation} is already attached to piece {piece}")]
    AlreadyAttached { mutation: MutationId, piece: PieceId },
    #[error("mutation {mutation} is not attached to piece {piece}")]
    NotAttached { mutation: MutationId, piece: PieceId },
    #[error("unknown mutation {0}")]
    UnknownMutation(MutationId),
    #[error("piece {0} is not on the board")]
    UnknownPiece(PieceId),
    #[error(transparent)]
    Board(#[from] BoardError),
}

impl MutationError {
    /// Rejections the caller is expected to shrug off, leaving the piece as it was.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MutationError::Incompatible { .. } | MutationError::AlreadyAttached { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(String);

impl MutationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MutationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// What a turn-end hook wants done with its attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Keep,
    Expire,
}

/// Behaviour of a mutation. One instance is shared by every piece carrying
/// the mutation, so anything that changes over time goes into the
/// [`MutationState`] reachable through the context.
pub trait MutationEffect: fmt::Debug + Send + Sync {
    fn on_attach(&self, _ctx: &mut MutationContext<'_>) {}

    fn on_detach(&self, _ctx: &mut MutationContext<'_>) {}

    fn on_move(&self, _ctx: &mut MutationContext<'_>, _mv: &Move) {}

    fn on_capture(&self, _ctx: &mut MutationContext<'_>, _victim: &Piece, _mv: &Move) {}

    fn on_turn_end(&self, _ctx: &mut MutationContext<'_>) -> Lifecycle {
        Lifecycle::Keep
    }
}

#[derive(Debug)]
pub struct Mutation {
    pub id: MutationId,
    pub name: String,
    pub cost: u32,
    pub rarity: Rarity,
    /// Empty means any piece type.
    pub compatible: BTreeSet<PieceType>,
    pub stackable: bool,
    effect: Arc<dyn MutationEffect>,
}

impl Mutation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, effect: Arc<dyn MutationEffect>) -> Self {
        Self {
            id: MutationId::new(id),
            name: name.into(),
            cost: 0,
            rarity: Rarity::Common,
            compatible: BTreeSet::new(),
            stackable: false,
            effect,
        }
    }

    #[must_use]
    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub fn rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    #[must_use]
    pub fn compatible_with(mut self, types: &[PieceType]) -> Self {
        self.compatible = types.iter().copied().collect();
        self
    }

    #[must_use]
    pub fn stackable(mut self, stackable: bool) -> Self {
        self.stackable = stackable;
        self
    }

    pub fn is_compatible(&self, piece_type: PieceType) -> bool {
        self.compatible.is_empty() || self.compatible.contains(&piece_type)
    }

    pub fn effect(&self) -> &Arc<dyn MutationEffect> {
        &self.effect
    }
}

/// Handed to every hook: the live board, the piece the hook runs for and
/// that attachment's private state.
pub struct MutationContext<'a> {
    board: &'a mut Board,
    piece: PieceId,
    state: &'a mut MutationState,
}

impl<'a> MutationContext<'a> {
    pub(crate) fn new(board: &'a mut Board, piece: PieceId, state: &'a mut MutationState) -> Self {
        Self { board, piece, state }
    }

    pub fn piece_id(&self) -> PieceId {
        self.piece
    }

    /// `None` once the piece has left the board (e.g. during unregistering).
    pub fn piece(&self) -> Option<&Piece> {
        self.board.piece(self.piece)
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        self.board
    }

    pub fn state(&mut self) -> &mut MutationState {
        self.state
    }

    /// Attaches `rule` to the piece and records it so detaching removes it.
    pub fn add_rule(&mut self, rule: Arc<MovementRule>) -> Option<RuleHandle> {
        let handle = self.board.piece_mut(self.piece)?.add_rule(rule);
        self.state.record_injected(handle);
        Some(handle)
    }

    /// Takes every rule currently on the piece off it until this
    /// attachment is detached.
    pub fn suppress_existing_rules(&mut self) {
        if let Some(piece) = self.board.piece_mut(self.piece) {
            let slots = piece.take_rules();
            self.state.record_suppressed(slots);
        }
    }

    /// Like [`suppress_existing_rules`](Self::suppress_existing_rules), but
    /// rules added by later attachments are held back too until this one is
    /// detached.
    pub fn block_rules(&mut self) {
        self.suppress_existing_rules();
        self.state.set_blocking();
    }
}
