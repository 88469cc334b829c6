//! Built-in mutation behaviours.

use std::sync::Arc;

use log::{debug, trace};

use crate::rules::{self, MovementRule};
use crate::{Move, Piece, PieceType, Position};

use super::{Lifecycle, MutationContext, MutationEffect};

const CHARGES: &str = "charges";
const COOLDOWN: &str = "cooldown";
const TURNS_LEFT: &str = "turns_left";
const TRAIL: &str = "trail";

/// Adds extra reachability on top of whatever the piece already has.
#[derive(Debug)]
pub struct AddRules {
    rules: Vec<Arc<MovementRule>>,
}

impl AddRules {
    pub fn new(rules: Vec<Arc<MovementRule>>) -> Self {
        Self { rules }
    }
}

impl MutationEffect for AddRules {
    fn on_attach(&self, ctx: &mut MutationContext<'_>) {
        for rule in &self.rules {
            ctx.add_rule(Arc::clone(rule));
        }
    }
}

/// Swaps the piece's rule set out for a new one while attached.
#[derive(Debug)]
pub struct ReplaceRules {
    rules: Vec<Arc<MovementRule>>,
}

impl ReplaceRules {
    pub fn new(rules: Vec<Arc<MovementRule>>) -> Self {
        Self { rules }
    }
}

impl MutationEffect for ReplaceRules {
    fn on_attach(&self, ctx: &mut MutationContext<'_>) {
        ctx.suppress_existing_rules();
        for rule in &self.rules {
            ctx.add_rule(Arc::clone(rule));
        }
    }
}

/// Pins the piece in place for a number of turns, then falls off.
#[derive(Debug)]
pub struct Shackle {
    turns: i64,
}

impl Shackle {
    pub fn new(turns: i64) -> Self {
        Self { turns: turns.max(1) }
    }
}

impl MutationEffect for Shackle {
    fn on_attach(&self, ctx: &mut MutationContext<'_>) {
        ctx.block_rules();
        ctx.add_rule(rules::null());
        ctx.state().set_int(TURNS_LEFT, self.turns);
    }

    fn on_turn_end(&self, ctx: &mut MutationContext<'_>) -> Lifecycle {
        if ctx.state().count_down(TURNS_LEFT) == 0 {
            Lifecycle::Expire
        } else {
            Lifecycle::Keep
        }
    }
}

/// Leaves a friendly piece behind on the vacated square, a limited number
/// of times per carrier.
#[derive(Debug)]
pub struct SpawnOnMove {
    piece_type: PieceType,
    charges: i64,
}

impl SpawnOnMove {
    pub fn new(piece_type: PieceType, charges: i64) -> Self {
        Self { piece_type, charges }
    }
}

impl MutationEffect for SpawnOnMove {
    fn on_attach(&self, ctx: &mut MutationContext<'_>) {
        ctx.state().set_int(CHARGES, self.charges);
    }

    fn on_move(&self, ctx: &mut MutationContext<'_>, mv: &Move) {
        if ctx.state().int(CHARGES).unwrap_or(0) <= 0 {
            return;
        }
        let Some(team) = ctx.piece().map(|piece| piece.team) else {
            return;
        };
        if !ctx.board().is_free(mv.from) {
            return;
        }
        if let Ok(id) = ctx.board_mut().place_piece(self.piece_type, team, mv.from) {
            let left = ctx.state().count_down(CHARGES);
            debug!("{} split off {} at {} ({} left)", ctx.piece_id(), id, mv.from, left);
        }
    }
}

/// Vacated squares turn into obstacles for a few turns.
#[derive(Debug)]
pub struct ObstacleTrail {
    duration: i64,
}

impl ObstacleTrail {
    pub fn new(duration: i64) -> Self {
        Self { duration: duration.max(1) }
    }
}

impl MutationEffect for ObstacleTrail {
    fn on_move(&self, ctx: &mut MutationContext<'_>, mv: &Move) {
        if !ctx.board().is_free(mv.from) {
            return;
        }
        if ctx.board_mut().set_obstacle(mv.from, true).is_ok() {
            trace!("trail obstacle at {} for {} turns", mv.from, self.duration);
            ctx.state().timers_mut(TRAIL).push((mv.from, self.duration));
        }
    }

    fn on_turn_end(&self, ctx: &mut MutationContext<'_>) -> Lifecycle {
        let mut cleared = Vec::new();
        ctx.state().timers_mut(TRAIL).retain_mut(|(pos, turns)| {
            *turns -= 1;
            if *turns <= 0 {
                cleared.push(*pos);
                false
            } else {
                true
            }
        });
        for pos in cleared {
            let _ = ctx.board_mut().set_obstacle(pos, false);
        }
        Lifecycle::Keep
    }

    fn on_detach(&self, ctx: &mut MutationContext<'_>) {
        let remaining: Vec<Position> = ctx.state().timers_mut(TRAIL).drain(..).map(|(pos, _)| pos).collect();
        for pos in remaining {
            let _ = ctx.board_mut().set_obstacle(pos, false);
        }
    }
}

/// After moving, hops to the horizontally mirrored square if it is free.
/// Recharges over a number of turns.
#[derive(Debug)]
pub struct Blink {
    cooldown: i64,
}

impl Blink {
    pub fn new(cooldown: i64) -> Self {
        Self { cooldown }
    }
}

impl MutationEffect for Blink {
    fn on_move(&self, ctx: &mut MutationContext<'_>, mv: &Move) {
        if ctx.state().int(COOLDOWN).unwrap_or(0) > 0 {
            return;
        }
        let Some(current) = ctx.piece().map(|piece| piece.position) else {
            return;
        };
        if current != mv.to {
            return;
        }
        let target = Position::new(ctx.board().width() - 1 - current.file, current.rank);
        if target == current || !ctx.board().is_free(target) {
            return;
        }
        if ctx.board_mut().move_piece(current, target).is_ok() {
            debug!("{} blinked {} -> {}", ctx.piece_id(), current, target);
            ctx.state().set_int(COOLDOWN, self.cooldown);
        }
    }

    fn on_turn_end(&self, ctx: &mut MutationContext<'_>) -> Lifecycle {
        ctx.state().count_down(COOLDOWN);
        Lifecycle::Keep
    }
}

/// Raises a friendly piece on the square the carrier captured from.
#[derive(Debug)]
pub struct SpawnOnCapture {
    piece_type: PieceType,
}

impl SpawnOnCapture {
    pub fn new(piece_type: PieceType) -> Self {
        Self { piece_type }
    }
}

impl MutationEffect for SpawnOnCapture {
    fn on_capture(&self, ctx: &mut MutationContext<'_>, victim: &Piece, mv: &Move) {
        let Some(team) = ctx.piece().map(|piece| piece.team) else {
            return;
        };
        if !ctx.board().is_free(mv.from) {
            return;
        }
        if let Ok(id) = ctx.board_mut().place_piece(self.piece_type, team, mv.from) {
            debug!("{} raised {} after taking {:?}", ctx.piece_id(), id, victim.piece_type);
        }
    }
}
