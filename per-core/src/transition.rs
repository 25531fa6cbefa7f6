//! Transition stored in the replay store.
use serde::{Deserialize, Serialize};

/// One observed step `(s_t, a_t, r_t, s_t+1, terminal)` with its priority bookkeeping.
///
/// `S` and `A` are opaque identifiers of states and actions. The store never
/// inspects them; they are handed back to the value function during replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// State `s_t`.
    pub state: S,

    /// Action `a_t`.
    pub action: A,

    /// Reward `r_t`.
    pub reward: f32,

    /// State `s_t+1`.
    pub next_state: S,

    /// If `s_t+1` is terminal.
    pub terminal: bool,

    /// The latest signed TD error observed for this transition.
    pub td_error: f32,

    /// Sampling priority, `(|td_error| + floor)^alpha`. Always positive.
    pub priority: f32,

    /// Insertion order over the lifetime of the store.
    pub sequence_number: u64,
}

impl<S, A> Transition<S, A> {
    /// Returns `true` if the transition ends an episode.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}
