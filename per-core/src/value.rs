//! Action-value functions consumed by the replay cycle.
use serde::{Deserialize, Serialize};

/// Action-value function $Q(s, a)$ that can be queried and updated.
///
/// The replay engine knows nothing about the representation behind this trait;
/// it can be a dense table, a hash map or a function approximator.
pub trait ValueFunction {
    /// State identifier.
    type State;

    /// Action identifier.
    type Action;

    /// Returns $Q(s, a)$.
    fn value(&self, state: &Self::State, action: &Self::Action) -> f32;

    /// Returns $\max_a Q(s, a)$.
    fn max_value(&self, state: &Self::State) -> f32;

    /// Moves $Q(s, a)$ toward `target` with the given step size.
    fn update(&mut self, state: &Self::State, action: &Self::Action, target: f32, step: f32);
}

/// Dense tabular action-value function over `usize` states and actions.
///
/// The update rule is $Q(s, a) \leftarrow Q(s, a) + \eta (y - Q(s, a))$.
/// Indices out of range panic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabularValueFunction {
    n_states: usize,
    n_actions: usize,
    table: Vec<f32>,
}

impl TabularValueFunction {
    /// Creates a table filled with zeros.
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        assert!(n_actions > 0, "at least one action is required");
        Self {
            n_states,
            n_actions,
            table: vec![0f32; n_states * n_actions],
        }
    }

    #[inline]
    fn ix(&self, state: usize, action: usize) -> usize {
        assert!(
            state < self.n_states && action < self.n_actions,
            "(state, action) = ({}, {}) out of range ({}, {})",
            state,
            action,
            self.n_states,
            self.n_actions
        );
        state * self.n_actions + action
    }

    /// Sets $Q(s, a)$.
    pub fn set_value(&mut self, state: usize, action: usize, value: f32) {
        let ix = self.ix(state, action);
        self.table[ix] = value;
    }

    /// Action with the largest value at `state`; the first one on ties.
    pub fn greedy_action(&self, state: usize) -> usize {
        let row = self.row(state);
        let mut best = 0;
        for (a, v) in row.iter().enumerate().skip(1) {
            if *v > row[best] {
                best = a;
            }
        }
        best
    }

    /// Values of all actions at `state`.
    pub fn row(&self, state: usize) -> &[f32] {
        let start = self.ix(state, 0);
        &self.table[start..start + self.n_actions]
    }

    /// Number of states.
    pub fn num_states(&self) -> usize {
        self.n_states
    }

    /// Number of actions.
    pub fn num_actions(&self) -> usize {
        self.n_actions
    }
}

impl ValueFunction for TabularValueFunction {
    type State = usize;
    type Action = usize;

    fn value(&self, state: &usize, action: &usize) -> f32 {
        self.table[self.ix(*state, *action)]
    }

    fn max_value(&self, state: &usize) -> f32 {
        self.row(*state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn update(&mut self, state: &usize, action: &usize, target: f32, step: f32) {
        let ix = self.ix(*state, *action);
        let q = self.table[ix];
        self.table[ix] = q + step * (target - q);
    }
}
