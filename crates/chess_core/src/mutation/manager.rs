use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::board::Board;
use crate::{Move, Piece, PieceId};

use super::{Lifecycle, Mutation, MutationCatalog, MutationContext, MutationError, MutationId, MutationState};

/// Result of a move played through the manager on the live board.
#[derive(Debug)]
pub struct MoveOutcome {
    pub mover: PieceId,
    pub captured: Option<Piece>,
}

/// Sole owner of mutation state. Attaching, detaching and hook dispatch all
/// go through here so that per-piece data never ends up on a shared
/// definition.
#[derive(Debug, Default)]
pub struct MutationManager {
    states: BTreeMap<PieceId, Vec<MutationState>>,
}

impl MutationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_mutation(
        &mut self,
        board: &mut Board,
        piece: PieceId,
        mutation: &Arc<Mutation>,
    ) -> Result<(), MutationError> {
        let piece_type = board
            .piece(piece)
            .ok_or(MutationError::UnknownPiece(piece))?
            .piece_type;

        if !mutation.is_compatible(piece_type) {
            warn!("refusing {} on {:?} {}: incompatible type", mutation.id, piece_type, piece);
            return Err(MutationError::Incompatible {
                mutation: mutation.id.clone(),
                piece_type,
            });
        }
        if !mutation.stackable && self.has_mutation(piece, &mutation.id) {
            warn!("refusing {} on {}: already attached", mutation.id, piece);
            return Err(MutationError::AlreadyAttached {
                mutation: mutation.id.clone(),
                piece,
            });
        }

        let mut state = MutationState::new(Arc::clone(mutation));
        {
            let mut ctx = MutationContext::new(board, piece, &mut state);
            mutation.effect().on_attach(&mut ctx);
        }
        if let Some(siblings) = self.states.get_mut(&piece) {
            hold_under_block(board, piece, &mut state, siblings);
        }
        if let Some(target) = board.piece_mut(piece) {
            target.mark_mutated();
        }
        debug!(
            "attached {} to {} ({} rules injected)",
            mutation.id,
            piece,
            state.injected_rules().len()
        );
        self.states.entry(piece).or_default().push(state);
        Ok(())
    }

    /// Detaches the most recent attachment of `mutation` from `piece`.
    pub fn remove_mutation(
        &mut self,
        board: &mut Board,
        piece: PieceId,
        mutation: &MutationId,
    ) -> Result<(), MutationError> {
        let not_attached = || MutationError::NotAttached {
            mutation: mutation.clone(),
            piece,
        };
        let states = self.states.get_mut(&piece).ok_or_else(not_attached)?;
        let index = states
            .iter()
            .rposition(|state| state.id() == mutation)
            .ok_or_else(not_attached)?;

        let state = states.remove(index);
        detach(board, piece, state, states);
        if states.is_empty() {
            self.states.remove(&piece);
        }
        debug!("detached {} from {}", mutation, piece);
        Ok(())
    }

    /// Ids of the mutations on `piece`, in attach order.
    pub fn get_mutations(&self, piece: PieceId) -> Vec<MutationId> {
        self.states
            .get(&piece)
            .map(|states| states.iter().map(|state| state.id().clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_mutation(&self, piece: PieceId, mutation: &MutationId) -> bool {
        self.states
            .get(&piece)
            .is_some_and(|states| states.iter().any(|state| state.id() == mutation))
    }

    /// Read-only view of an attachment's state, for diagnostics.
    pub fn state(&self, piece: PieceId, mutation: &MutationId) -> Option<&MutationState> {
        self.states
            .get(&piece)?
            .iter()
            .rev()
            .find(|state| state.id() == mutation)
    }

    pub fn tracked_pieces(&self) -> impl Iterator<Item = PieceId> + '_ {
        self.states.keys().copied()
    }

    pub fn notify_move(&mut self, board: &mut Board, piece: PieceId, mv: &Move) {
        let Some(states) = self.states.get_mut(&piece) else {
            return;
        };
        for state in states.iter_mut() {
            let mutation = Arc::clone(state.mutation());
            let mut ctx = MutationContext::new(board, piece, state);
            mutation.effect().on_move(&mut ctx, mv);
        }
    }

    pub fn notify_capture(&mut self, board: &mut Board, piece: PieceId, victim: &Piece, mv: &Move) {
        let Some(states) = self.states.get_mut(&piece) else {
            return;
        };
        for state in states.iter_mut() {
            let mutation = Arc::clone(state.mutation());
            let mut ctx = MutationContext::new(board, piece, state);
            mutation.effect().on_capture(&mut ctx, victim, mv);
        }
    }

    /// Detaches everything from a captured or destroyed piece. Returns how
    /// many attachments were dropped.
    pub fn unregister_piece(&mut self, board: &mut Board, piece: PieceId) -> usize {
        let Some(mut states) = self.states.remove(&piece) else {
            return 0;
        };
        let count = states.len();
        while let Some(state) = states.pop() {
            detach(board, piece, state, &mut states);
        }
        debug!("unregistered {} ({} mutations dropped)", piece, count);
        count
    }

    /// Runs turn-end hooks for every attachment and drops the ones that
    /// expire. Pieces that vanished from the board are unregistered.
    pub fn end_turn(&mut self, board: &mut Board) {
        let pieces: Vec<PieceId> = self.states.keys().copied().collect();
        for piece in pieces {
            if board.piece(piece).is_none() {
                self.unregister_piece(board, piece);
                continue;
            }

            let mut expired = Vec::new();
            if let Some(states) = self.states.get_mut(&piece) {
                for (index, state) in states.iter_mut().enumerate() {
                    let mutation = Arc::clone(state.mutation());
                    let mut ctx = MutationContext::new(board, piece, state);
                    if mutation.effect().on_turn_end(&mut ctx) == Lifecycle::Expire {
                        expired.push(index);
                    }
                }
            }

            for index in expired.into_iter().rev() {
                if let Some(states) = self.states.get_mut(&piece) {
                    let state = states.remove(index);
                    debug!("{} expired on {}", state.id(), piece);
                    detach(board, piece, state, states);
                }
            }
            if self.states.get(&piece).is_some_and(Vec::is_empty) {
                self.states.remove(&piece);
            }
        }
    }

    /// Plays a move on the live board: moves the piece, unregisters any
    /// captured piece, then fires capture and move hooks on the mover.
    pub fn perform_move(&mut self, board: &mut Board, mv: &Move) -> Result<MoveOutcome, MutationError> {
        let mover = board
            .get_piece_at(mv.from)?
            .map(|piece| piece.id)
            .ok_or(crate::board::BoardError::EmptySquare(mv.from))?;

        let captured = board.move_piece(mv.from, mv.to)?;
        if let Some(victim) = &captured {
            self.unregister_piece(board, victim.id);
            self.notify_capture(board, mover, victim, mv);
        }
        self.notify_move(board, mover, mv);

        Ok(MoveOutcome { mover, captured })
    }

    /// `(piece, mutation)` pairs, enough to rebuild every attachment.
    pub fn snapshot(&self) -> Vec<(PieceId, MutationId)> {
        self.states
            .iter()
            .flat_map(|(piece, states)| states.iter().map(move |state| (*piece, state.id().clone())))
            .collect()
    }

    /// Rebuilds attachments from a [`snapshot`](Self::snapshot). Counters
    /// and timers start fresh, as on a normal attach.
    pub fn restore(
        &mut self,
        board: &mut Board,
        pairs: &[(PieceId, MutationId)],
        catalog: &MutationCatalog,
    ) -> Result<(), MutationError> {
        for (piece, id) in pairs {
            let mutation = catalog
                .get(id)
                .ok_or_else(|| MutationError::UnknownMutation(id.clone()))?;
            self.apply_mutation(board, *piece, mutation)?;
        }
        Ok(())
    }
}

/// Keeps a fresh attachment from reviving a blocked piece. While a sibling
/// blocks, the rules the newcomer added go to that sibling's held list, and
/// a newcomer that swapped out rules also takes over the ones the blocker
/// was holding, so it swaps those out as well.
fn hold_under_block(board: &mut Board, piece: PieceId, state: &mut MutationState, siblings: &mut [MutationState]) {
    if state.is_blocking() {
        return;
    }
    let Some(blocker) = siblings.iter_mut().rev().find(|sibling| sibling.is_blocking()) else {
        return;
    };

    if !state.suppressed_rules().is_empty() {
        state.record_suppressed(blocker.take_suppressed());
    }
    let Some(target) = board.piece_mut(piece) else {
        return;
    };
    let held: Vec<_> = state
        .injected_rules()
        .iter()
        .filter_map(|&handle| target.remove_rule(handle))
        .collect();
    blocker.record_suppressed(held);
}

/// Runs the detach hook, then removes exactly the rules `state` injected
/// and puts back the rules it suppressed. `siblings` are the piece's other
/// attachments; an injected rule that one of them (or `state` itself) holds
/// is dropped from there instead so it is never restored later. While a
/// sibling still blocks, the restored rules go to that sibling.
fn detach(board: &mut Board, piece: PieceId, mut state: MutationState, siblings: &mut [MutationState]) {
    let mutation = Arc::clone(state.mutation());
    {
        let mut ctx = MutationContext::new(board, piece, &mut state);
        mutation.effect().on_detach(&mut ctx);
    }

    for handle in state.take_injected() {
        let removed = board
            .piece_mut(piece)
            .and_then(|target| target.remove_rule(handle))
            .is_some();
        if !removed && !siblings.iter_mut().any(|sibling| sibling.forget_suppressed(handle)) {
            state.forget_suppressed(handle);
        }
    }

    let suppressed = state.take_suppressed();
    match siblings.iter_mut().rev().find(|sibling| sibling.is_blocking()) {
        Some(blocker) => blocker.record_suppressed(suppressed),
        None => {
            if let Some(target) = board.piece_mut(piece) {
                for slot in suppressed {
                    target.restore_rule(slot);
                }
            }
        }
    }
    if let Some(target) = board.piece_mut(piece) {
        target.unmark_mutated();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::effects::{AddRules, ReplaceRules, Shackle};
    use crate::{rules, PieceType, Position, Team};

    fn add_knight() -> Arc<Mutation> {
        Arc::new(Mutation::new("leap", "Leap", Arc::new(AddRules::new(vec![rules::knight()]))))
    }

    fn setup() -> (Board, PieceId, PieceId) {
        let mut board = Board::new(8, 8);
        let a = board.place_piece(PieceType::Rook, Team::White, Position::new(0, 0)).unwrap();
        let b = board.place_piece(PieceType::Rook, Team::White, Position::new(7, 0)).unwrap();
        (board, a, b)
    }

    #[test]
    fn duplicate_attach_is_rejected_unless_stackable() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        let mutation = add_knight();
        manager.apply_mutation(&mut board, a, &mutation).unwrap();
        let err = manager.apply_mutation(&mut board, a, &mutation).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(board.piece(a).unwrap().rules().len(), 2);

        let stacking = Arc::new(
            Mutation::new("stack", "Stack", Arc::new(AddRules::new(vec![rules::king()]))).stackable(true),
        );
        manager.apply_mutation(&mut board, a, &stacking).unwrap();
        manager.apply_mutation(&mut board, a, &stacking).unwrap();
        assert_eq!(manager.get_mutations(a).len(), 3);
        assert_eq!(board.piece(a).unwrap().mutation_count(), 3);
    }

    #[test]
    fn incompatible_attach_leaves_piece_untouched() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        let pawn_only = Arc::new(
            Mutation::new("p", "Pawn only", Arc::new(AddRules::new(vec![rules::knight()])))
                .compatible_with(&[PieceType::Pawn]),
        );
        let err = manager.apply_mutation(&mut board, a, &pawn_only).unwrap_err();
        assert!(matches!(err, MutationError::Incompatible { piece_type: PieceType::Rook, .. }));
        assert!(!board.piece(a).unwrap().has_mutations());
        assert!(manager.get_mutations(a).is_empty());
    }

    #[test]
    fn removing_unknown_attachment_fails() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        let err = manager.remove_mutation(&mut board, a, &MutationId::from("leap")).unwrap_err();
        assert!(matches!(err, MutationError::NotAttached { .. }));
    }

    #[test]
    fn replaced_rules_come_back_without_injected_ones_from_later_detaches() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        let leap = add_knight();
        let replace = Arc::new(Mutation::new("replace", "Replace", Arc::new(ReplaceRules::new(vec![rules::king()]))));

        manager.apply_mutation(&mut board, a, &leap).unwrap();
        manager.apply_mutation(&mut board, a, &replace).unwrap();
        // rook + knight are suppressed, only the king step is live
        assert_eq!(board.piece(a).unwrap().rules().len(), 1);

        manager.remove_mutation(&mut board, a, &leap.id).unwrap();
        manager.remove_mutation(&mut board, a, &replace.id).unwrap();
        let piece = board.piece(a).unwrap();
        assert_eq!(piece.rules().len(), 1);
        assert_eq!(*piece.rules()[0].rule, *rules::rook());
        assert!(!piece.has_mutations());
    }

    #[test]
    fn snapshot_restores_onto_a_fresh_manager() {
        let (mut board, a, b) = setup();
        let catalog = MutationCatalog::standard();
        let mut manager = MutationManager::new();
        let leap = catalog.get(&MutationId::from("knight_leap")).unwrap().clone();
        manager.apply_mutation(&mut board, a, &leap).unwrap();
        manager.apply_mutation(&mut board, b, &leap).unwrap();

        let pairs = manager.snapshot();
        let mut fresh_board = Board::new(8, 8);
        let a2 = fresh_board.place_piece(PieceType::Rook, Team::White, Position::new(0, 0)).unwrap();
        let b2 = fresh_board.place_piece(PieceType::Rook, Team::White, Position::new(7, 0)).unwrap();
        assert_eq!((a2, b2), (a, b));

        let mut restored = MutationManager::new();
        restored.restore(&mut fresh_board, &pairs, &catalog).unwrap();
        assert_eq!(restored.snapshot(), pairs);
        assert_eq!(fresh_board.valid_destinations(a2), board.valid_destinations(a));
    }

    #[test]
    fn restore_reports_unknown_ids() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        let err = manager
            .restore(&mut board, &[(a, MutationId::from("nope"))], &MutationCatalog::standard())
            .unwrap_err();
        assert_eq!(err, MutationError::UnknownMutation(MutationId::from("nope")));
    }

    #[test]
    fn end_turn_cleans_up_pieces_removed_behind_its_back() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &add_knight()).unwrap();
        board.remove_piece_by_id(a);
        manager.end_turn(&mut board);
        assert_eq!(manager.tracked_pieces().count(), 0);
    }

    fn sprinter() -> Arc<Mutation> {
        Arc::new(Mutation::new(
            "sprinter",
            "Sprinter",
            Arc::new(ReplaceRules::new(vec![rules::king(), rules::knight()])),
        ))
    }

    fn shackle() -> Arc<Mutation> {
        Arc::new(Mutation::new("shackled", "Shackled", Arc::new(Shackle::new(5))))
    }

    #[test]
    fn removing_a_replacement_keeps_the_shackle_in_force() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &sprinter()).unwrap();
        manager.apply_mutation(&mut board, a, &shackle()).unwrap();
        assert!(board.valid_destinations(a).is_empty());

        manager.remove_mutation(&mut board, a, &MutationId::from("sprinter")).unwrap();
        assert_eq!(manager.get_mutations(a), vec![MutationId::from("shackled")]);
        assert!(board.valid_destinations(a).is_empty());

        manager.remove_mutation(&mut board, a, &MutationId::from("shackled")).unwrap();
        let rook = board.piece(a).unwrap();
        assert_eq!(rook.rules().len(), 1);
        assert_eq!(*rook.rules()[0].rule, *rules::rook());
        assert_eq!(board.valid_destinations(a).len(), 13);
    }

    #[test]
    fn rules_added_while_shackled_wait_for_the_shackle() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &shackle()).unwrap();
        manager.apply_mutation(&mut board, a, &add_knight()).unwrap();
        assert!(board.valid_destinations(a).is_empty());

        manager.remove_mutation(&mut board, a, &MutationId::from("shackled")).unwrap();
        let reach = board.valid_destinations(a);
        assert!(reach.contains(&Position::new(1, 2)));
        assert!(reach.contains(&Position::new(0, 5)));
        assert_eq!(board.piece(a).unwrap().rules().len(), 2);
    }

    #[test]
    fn dropping_an_addition_while_shackled_leaves_nothing_behind() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &shackle()).unwrap();
        manager.apply_mutation(&mut board, a, &add_knight()).unwrap();
        manager.remove_mutation(&mut board, a, &MutationId::from("leap")).unwrap();
        manager.remove_mutation(&mut board, a, &MutationId::from("shackled")).unwrap();

        let rook = board.piece(a).unwrap();
        assert_eq!(rook.rules().len(), 1);
        assert_eq!(*rook.rules()[0].rule, *rules::rook());
        assert!(!rook.has_mutations());
    }

    #[test]
    fn replacement_under_a_shackle_takes_effect_once_it_lifts() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &shackle()).unwrap();
        manager.apply_mutation(&mut board, a, &sprinter()).unwrap();
        assert!(board.valid_destinations(a).is_empty());

        manager.remove_mutation(&mut board, a, &MutationId::from("shackled")).unwrap();
        let reach = board.valid_destinations(a);
        assert!(reach.contains(&Position::new(1, 2)));
        assert!(!reach.contains(&Position::new(0, 5)));

        manager.remove_mutation(&mut board, a, &MutationId::from("sprinter")).unwrap();
        let rook = board.piece(a).unwrap();
        assert_eq!(rook.rules().len(), 1);
        assert_eq!(*rook.rules()[0].rule, *rules::rook());
    }

    #[test]
    fn replacement_dropped_under_a_shackle_restores_the_base_rules_later() {
        let (mut board, a, _) = setup();
        let mut manager = MutationManager::new();
        manager.apply_mutation(&mut board, a, &shackle()).unwrap();
        manager.apply_mutation(&mut board, a, &sprinter()).unwrap();
        manager.remove_mutation(&mut board, a, &MutationId::from("sprinter")).unwrap();
        assert!(board.valid_destinations(a).is_empty());

        manager.remove_mutation(&mut board, a, &MutationId::from("shackled")).unwrap();
        let rook = board.piece(a).unwrap();
        assert_eq!(rook.rules().len(), 1);
        assert_eq!(*rook.rules()[0].rule, *rules::rook());
    }
}
