use std::collections::BTreeMap;
use std::sync::Arc;

use crate::rules::{self, ALL_DIRECTIONS};
use crate::PieceType;

use super::effects::{AddRules, Blink, ObstacleTrail, ReplaceRules, Shackle, SpawnOnCapture, SpawnOnMove};
use super::{Mutation, MutationId, Rarity};

const NON_KING: [PieceType; 5] = [
    PieceType::Pawn,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
];

/// Lookup of mutation definitions by id.
#[derive(Debug, Default, Clone)]
pub struct MutationCatalog {
    mutations: BTreeMap<MutationId, Arc<Mutation>>,
}

impl MutationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut catalog = Self::new();

        catalog.register(
            Mutation::new("knight_leap", "Knight's Leap", Arc::new(AddRules::new(vec![rules::knight()])))
                .cost(3)
                .rarity(Rarity::Uncommon)
                .compatible_with(&[
                    PieceType::Pawn,
                    PieceType::Bishop,
                    PieceType::Rook,
                    PieceType::Queen,
                    PieceType::King,
                ]),
        );
        catalog.register(
            Mutation::new("retreat", "Retreat", Arc::new(AddRules::new(vec![rules::backward_step()])))
                .cost(1)
                .compatible_with(&[PieceType::Pawn]),
        );
        catalog.register(
            Mutation::new("sidestep", "Sidestep", Arc::new(AddRules::new(vec![rules::diagonal_step()])))
                .cost(2)
                .compatible_with(&[PieceType::Pawn, PieceType::Knight, PieceType::Rook]),
        );
        catalog.register(
            Mutation::new(
                "sprinter",
                "Sprinter",
                Arc::new(ReplaceRules::new(vec![
                    rules::fixed_distance(&ALL_DIRECTIONS, 3),
                    rules::king(),
                ])),
            )
            .cost(4)
            .rarity(Rarity::Rare)
            .compatible_with(&[PieceType::Bishop, PieceType::Rook, PieceType::Queen]),
        );
        catalog.register(
            Mutation::new("shackled", "Shackled", Arc::new(Shackle::new(2)))
                .rarity(Rarity::Common),
        );
        catalog.register(
            Mutation::new("mitosis", "Mitosis", Arc::new(SpawnOnMove::new(PieceType::Pawn, 2)))
                .cost(5)
                .rarity(Rarity::Rare)
                .compatible_with(&[PieceType::Pawn, PieceType::Knight]),
        );
        catalog.register(
            Mutation::new("cinder_trail", "Cinder Trail", Arc::new(ObstacleTrail::new(3)))
                .cost(3)
                .rarity(Rarity::Uncommon)
                .compatible_with(&[PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen]),
        );
        catalog.register(
            Mutation::new("blink", "Blink", Arc::new(Blink::new(3)))
                .cost(6)
                .rarity(Rarity::Legendary)
                .compatible_with(&[PieceType::Knight, PieceType::Bishop, PieceType::King]),
        );
        catalog.register(
            Mutation::new("necromancy", "Necromancy", Arc::new(SpawnOnCapture::new(PieceType::Pawn)))
                .cost(4)
                .rarity(Rarity::Rare)
                .compatible_with(&NON_KING)
                .stackable(true),
        );

        catalog
    }

    /// Adds or replaces a definition, returning the shared handle.
    pub fn register(&mut self, mutation: Mutation) -> Arc<Mutation> {
        let mutation = Arc::new(mutation);
        self.mutations.insert(mutation.id.clone(), Arc::clone(&mutation));
        mutation
    }

    pub fn get(&self, id: &MutationId) -> Option<&Arc<Mutation>> {
        self.mutations.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Mutation>> {
        self.mutations.values()
    }

    /// Definitions that may attach to `piece_type`.
    pub fn compatible_with(&self, piece_type: PieceType) -> impl Iterator<Item = &Arc<Mutation>> {
        self.iter().filter(move |mutation| mutation.is_compatible(piece_type))
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}
