//! Fixed-capacity circular store of transitions with per-slot priorities.
//!
//! The store keeps transitions in a ring buffer. Once the ring is full, every
//! [`PriorityStore::add`] overwrites the oldest slot. Each slot carries a priority
//! `(|td_error| + floor)^alpha`; aggregates over the valid slots (sum, maximum and
//! minimum) are maintained in trees indexed by slot, so that they stay exact
//! after inserts, overwrites and refreshes.
mod sum_tree;
use crate::{config::PerConfig, error::ReplayError, Transition};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sum_tree::SumTree;

/// Fixed-capacity circular container of transitions and their priorities.
#[derive(Debug)]
pub struct PriorityStore<S, A> {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Next slot to be written.
    write_cursor: usize,

    /// Number of valid slots.
    count: usize,

    /// Priority exponent.
    alpha: f32,

    /// Added to `|td_error|` so that no slot has zero probability.
    priority_floor: f32,

    /// Sequence number given to the next transition.
    next_sequence: u64,

    /// Slots `0..count`. Grows until `capacity`, then slots are replaced in place.
    pub(crate) transitions: Vec<Transition<S, A>>,

    /// Priorities indexed by slot.
    sum_tree: SumTree,
}

/// Serializable state of a [`PriorityStore`].
///
/// The store does not define a file format; callers serialize this value
/// with the serde backend of their choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot<S, A> {
    /// Capacity of the store.
    pub capacity: usize,

    /// Priority exponent.
    pub alpha: f32,

    /// Priority floor.
    pub priority_floor: f32,

    /// Next slot to be written.
    pub write_cursor: usize,

    /// Number of valid slots.
    pub count: usize,

    /// Maximum priority over valid slots at the time of the snapshot.
    pub max_priority: f32,

    /// Sequence number of the next transition.
    pub next_sequence: u64,

    /// Transitions in slot order.
    pub transitions: Vec<Transition<S, A>>,

    /// Priorities in slot order.
    pub priorities: Vec<f32>,
}

fn check_params(capacity: usize, alpha: f32, priority_floor: f32) -> Result<(), ReplayError> {
    if capacity == 0 {
        return Err(ReplayError::Configuration(
            "capacity must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(ReplayError::Configuration(format!(
            "priority exponent must be in [0, 1], got {}",
            alpha
        )));
    }
    if !priority_floor.is_finite() || priority_floor <= 0.0 {
        return Err(ReplayError::Configuration(format!(
            "priority floor must be a positive finite number, got {}",
            priority_floor
        )));
    }
    Ok(())
}

impl<S, A> PriorityStore<S, A> {
    /// Creates an empty store.
    ///
    /// Fails with [`ReplayError::Configuration`] if `capacity == 0`, `alpha` is outside
    /// `[0, 1]` or `priority_floor` is not positive.
    pub fn new(capacity: usize, alpha: f32, priority_floor: f32) -> Result<Self, ReplayError> {
        check_params(capacity, alpha, priority_floor)?;

        Ok(Self {
            capacity,
            write_cursor: 0,
            count: 0,
            alpha,
            priority_floor,
            next_sequence: 0,
            transitions: Vec::with_capacity(capacity),
            sum_tree: SumTree::new(capacity),
        })
    }

    /// Creates an empty store with the parameters in `per_config`.
    pub fn from_config(capacity: usize, per_config: &PerConfig) -> Result<Self, ReplayError> {
        Self::new(capacity, per_config.alpha, per_config.priority_floor)
    }

    /// Priority assigned to a transition with the given TD error.
    #[inline]
    pub fn priority_of(&self, td_error: f32) -> f32 {
        (td_error.abs() + self.priority_floor).powf(self.alpha)
    }

    fn check_td_error(td_error: f32) -> Result<(), ReplayError> {
        if td_error.is_finite() {
            Ok(())
        } else {
            Err(ReplayError::ContractViolation(format!(
                "TD error must be finite, got {}",
                td_error
            )))
        }
    }

    /// Computes the priority for `td_error` and checks that writing it to `slot`
    /// keeps every priority and the total finite and positive.
    ///
    /// `slot` may be the next slot to be written, which holds zero until it is filled.
    fn checked_priority(&self, slot: usize, td_error: f32) -> Result<f32, ReplayError> {
        Self::check_td_error(td_error)?;
        let priority = self.priority_of(td_error);
        if !priority.is_finite() || priority <= 0.0 {
            return Err(ReplayError::ContractViolation(format!(
                "TD error {} gives priority {}",
                td_error, priority
            )));
        }
        let delta = priority as f64 - self.sum_tree.leaf(slot) as f64;
        self.check_total(delta)?;
        Ok(priority)
    }

    /// Fails if the total priority would not be finite after changing it by `delta`.
    fn check_total(&self, delta: f64) -> Result<(), ReplayError> {
        let total = self.sum_tree.total() as f64 + delta;
        if (total as f32).is_finite() {
            Ok(())
        } else {
            Err(ReplayError::ContractViolation(format!(
                "total priority would overflow to {}",
                total
            )))
        }
    }

    fn check_slot(&self, slot: usize) -> Result<(), ReplayError> {
        if slot < self.count {
            Ok(())
        } else {
            Err(ReplayError::ContractViolation(format!(
                "slot {} is out of range, the store holds {} transitions",
                slot, self.count
            )))
        }
    }

    /// Adds a transition and returns the slot it was written to.
    ///
    /// When the store is full, the oldest transition is overwritten.
    /// Fails with [`ReplayError::ContractViolation`], writing nothing, if `td_error` is
    /// not finite or the total priority would overflow.
    pub fn add(
        &mut self,
        state: S,
        action: A,
        reward: f32,
        next_state: S,
        terminal: bool,
        td_error: f32,
    ) -> Result<usize, ReplayError> {
        let slot = self.write_cursor;
        let priority = self.checked_priority(slot, td_error)?;
        let tr = Transition {
            state,
            action,
            reward,
            next_state,
            terminal,
            td_error,
            priority,
            sequence_number: self.next_sequence,
        };

        if slot == self.transitions.len() {
            self.transitions.push(tr);
        } else {
            self.transitions[slot] = tr;
        }
        self.sum_tree.set(slot, priority);

        self.next_sequence += 1;
        self.write_cursor = (self.write_cursor + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
        trace!("add: slot={}, td_error={}, priority={}", slot, td_error, priority);

        Ok(slot)
    }

    /// Recomputes the priority of `slot` from a new TD error.
    ///
    /// The maximum priority is kept exact, including when the slot that held the
    /// maximum is lowered.
    pub fn refresh(&mut self, slot: usize, td_error: f32) -> Result<(), ReplayError> {
        self.check_slot(slot)?;
        let priority = self.checked_priority(slot, td_error)?;
        self.write_priority(slot, td_error, priority);
        Ok(())
    }

    fn write_priority(&mut self, slot: usize, td_error: f32, priority: f32) {
        let tr = &mut self.transitions[slot];
        tr.td_error = td_error;
        tr.priority = priority;
        self.sum_tree.set(slot, priority);
        trace!("refresh: slot={}, td_error={}, priority={}", slot, td_error, priority);
    }

    /// Refreshes `(slots[i], td_errors[i])` pairs, or none of them.
    ///
    /// All pairs are checked first, including the total priority after the whole
    /// batch. A slot given more than once ends up with its last TD error.
    pub(crate) fn refresh_all(
        &mut self,
        slots: &[usize],
        td_errors: &[f32],
    ) -> Result<(), ReplayError> {
        let mut last = BTreeMap::new();
        for (&slot, &td_error) in slots.iter().zip(td_errors.iter()) {
            self.check_slot(slot)?;
            last.insert(slot, (td_error, self.checked_priority(slot, td_error)?));
        }
        let delta = last
            .iter()
            .map(|(&slot, &(_, p))| p as f64 - self.sum_tree.leaf(slot) as f64)
            .sum::<f64>();
        self.check_total(delta)?;

        for (slot, (td_error, priority)) in last.into_iter() {
            self.write_priority(slot, td_error, priority);
        }
        Ok(())
    }

    /// Sum of priorities over valid slots.
    pub fn total_priority(&self) -> f32 {
        self.sum_tree.total()
    }

    /// Maximum priority over valid slots, `0` for an empty store.
    pub fn max_priority(&self) -> f32 {
        self.sum_tree.max(self.count)
    }

    /// Minimum priority over valid slots, `0` for an empty store.
    pub fn min_priority(&self) -> f32 {
        self.sum_tree.min(self.count)
    }

    /// Returns the first valid slot whose cumulative priority reaches or exceeds `u`.
    ///
    /// The store must not be empty.
    pub(crate) fn find(&self, u: f32) -> usize {
        debug_assert!(self.count > 0);
        // The tree never lands on an empty slot; the clamp guards rounding at the boundary.
        self.sum_tree.find(u).min(self.count - 1)
    }

    /// Priority of a slot known to be valid.
    #[inline]
    pub(crate) fn leaf(&self, slot: usize) -> f32 {
        self.sum_tree.leaf(slot)
    }

    /// Number of valid slots.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Alias of [`PriorityStore::len`].
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if no transition has been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if the next [`PriorityStore::add`] overwrites a transition.
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Capacity of the store.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next slot to be written.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Priority exponent.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Priority floor.
    pub fn priority_floor(&self) -> f32 {
        self.priority_floor
    }

    /// Transition at `slot`, if the slot is valid.
    pub fn get(&self, slot: usize) -> Option<&Transition<S, A>> {
        self.transitions.get(slot)
    }

    /// Priority at `slot`, if the slot is valid.
    pub fn priority(&self, slot: usize) -> Option<f32> {
        if slot < self.count {
            Some(self.sum_tree.leaf(slot))
        } else {
            None
        }
    }

    /// Priorities of valid slots in slot order.
    pub fn priorities(&self) -> Vec<f32> {
        (0..self.count).map(|ix| self.sum_tree.leaf(ix)).collect()
    }

    /// Iterates over `(slot, transition)` of valid slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Transition<S, A>)> {
        self.transitions.iter().enumerate()
    }
}

impl<S: Clone, A: Clone> PriorityStore<S, A> {
    /// Takes a snapshot of the store.
    pub fn snapshot(&self) -> StoreSnapshot<S, A> {
        StoreSnapshot {
            capacity: self.capacity,
            alpha: self.alpha,
            priority_floor: self.priority_floor,
            write_cursor: self.write_cursor,
            count: self.count,
            max_priority: self.max_priority(),
            next_sequence: self.next_sequence,
            transitions: self.transitions.clone(),
            priorities: self.priorities(),
        }
    }
}

impl<S, A> PriorityStore<S, A> {
    /// Rebuilds a store from a snapshot.
    ///
    /// The aggregates are recomputed from `priorities`; the stored `max_priority`
    /// is only used as a consistency check.
    pub fn from_snapshot(snapshot: StoreSnapshot<S, A>) -> Result<Self, ReplayError> {
        let StoreSnapshot {
            capacity,
            alpha,
            priority_floor,
            write_cursor,
            count,
            max_priority,
            next_sequence,
            transitions,
            priorities,
        } = snapshot;
        check_params(capacity, alpha, priority_floor)?;

        let invalid =
            |msg: String| Err(ReplayError::ContractViolation(format!("invalid snapshot: {}", msg)));
        if count > capacity {
            return invalid(format!("count {} exceeds capacity {}", count, capacity));
        }
        if transitions.len() != count || priorities.len() != count {
            return invalid(format!(
                "{} transitions and {} priorities for count {}",
                transitions.len(),
                priorities.len(),
                count
            ));
        }
        if write_cursor >= capacity || (count < capacity && write_cursor != count) {
            return invalid(format!("write cursor {} with count {}", write_cursor, count));
        }
        if priorities.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return invalid("priorities must be positive and finite".to_string());
        }

        let mut store = Self {
            capacity,
            write_cursor,
            count,
            alpha,
            priority_floor,
            next_sequence,
            transitions: Vec::with_capacity(capacity),
            sum_tree: SumTree::new(capacity),
        };
        for (slot, (mut tr, p)) in transitions
            .into_iter()
            .zip(priorities.into_iter())
            .enumerate()
        {
            tr.priority = p;
            store.transitions.push(tr);
            store.sum_tree.set(slot, p);
        }

        if !store.total_priority().is_finite() {
            return invalid("total priority overflows".to_string());
        }
        if (store.max_priority() - max_priority).abs() > 1e-6 * max_priority.abs().max(1.0) {
            return invalid(format!(
                "max priority {} does not match priorities (max {})",
                max_priority,
                store.max_priority()
            ));
        }

        Ok(store)
    }
}
