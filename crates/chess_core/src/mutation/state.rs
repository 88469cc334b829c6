use std::collections::BTreeMap;
use std::sync::Arc;

use crate::piece::{RuleHandle, RuleSlot};
use crate::Position;

use super::{Mutation, MutationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Int(i64),
    Bool(bool),
    Position(Position),
}

/// Everything that belongs to one (piece, mutation) attachment.
#[derive(Debug, Clone)]
pub struct MutationState {
    mutation: Arc<Mutation>,
    data: BTreeMap<String, StateValue>,
    /// Squares paired with a countdown, per key.
    timers: BTreeMap<String, Vec<(Position, i64)>>,
    injected: Vec<RuleHandle>,
    suppressed: Vec<RuleSlot>,
    blocking: bool,
}

impl MutationState {
    pub(crate) fn new(mutation: Arc<Mutation>) -> Self {
        Self {
            mutation,
            data: BTreeMap::new(),
            timers: BTreeMap::new(),
            injected: Vec::new(),
            suppressed: Vec::new(),
            blocking: false,
        }
    }

    pub fn mutation(&self) -> &Arc<Mutation> {
        &self.mutation
    }

    pub fn id(&self) -> &MutationId {
        &self.mutation.id
    }

    /// Rules this attachment added to its piece.
    pub fn injected_rules(&self) -> &[RuleHandle] {
        &self.injected
    }

    /// Rules this attachment took off its piece and will put back.
    pub fn suppressed_rules(&self) -> &[RuleSlot] {
        &self.suppressed
    }

    /// Whether this attachment holds back every other rule on its piece,
    /// including rules added after it.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub(crate) fn set_blocking(&mut self) {
        self.blocking = true;
    }

    pub(crate) fn record_injected(&mut self, handle: RuleHandle) {
        self.injected.push(handle);
    }

    pub(crate) fn record_suppressed(&mut self, slots: Vec<RuleSlot>) {
        self.suppressed.extend(slots);
    }

    pub(crate) fn take_injected(&mut self) -> Vec<RuleHandle> {
        std::mem::take(&mut self.injected)
    }

    pub(crate) fn take_suppressed(&mut self) -> Vec<RuleSlot> {
        std::mem::take(&mut self.suppressed)
    }

    /// Drops a suppressed slot whose owner was detached in the meantime.
    pub(crate) fn forget_suppressed(&mut self, handle: RuleHandle) -> bool {
        let before = self.suppressed.len();
        self.suppressed.retain(|slot| slot.handle != handle);
        before != self.suppressed.len()
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: StateValue) {
        self.data.insert(key.to_owned(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.data.remove(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.data.get(key) {
            Some(StateValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, StateValue::Int(value));
    }

    /// Decrements a counter, never below zero, and returns the new value.
    pub fn count_down(&mut self, key: &str) -> i64 {
        let next = (self.int(key).unwrap_or(0) - 1).max(0);
        self.set_int(key, next);
        next
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(StateValue::Bool(true)))
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.set(key, StateValue::Bool(value));
    }

    pub fn timers(&self, key: &str) -> &[(Position, i64)] {
        self.timers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn timers_mut(&mut self, key: &str) -> &mut Vec<(Position, i64)> {
        self.timers.entry(key.to_owned()).or_default()
    }
}
