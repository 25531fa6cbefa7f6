//! Refreshing priorities from new TD errors.
use crate::{error::ReplayError, PriorityStore};

/// Writes back priorities of sampled slots after a learning step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityRefresher;

impl PriorityRefresher {
    /// Creates a refresher.
    pub fn new() -> Self {
        Self
    }

    /// Refreshes `store` with `(ixs[i], td_errs[i])` pairs.
    ///
    /// The whole batch is validated first: on mismatched lengths, an out-of-range
    /// slot, a non-finite TD error or a total priority that would overflow,
    /// nothing is written and
    /// [`ReplayError::ContractViolation`] is returned.
    ///
    /// A slot appearing more than once ends up with its last TD error.
    pub fn refresh_batch<S, A>(
        &self,
        store: &mut PriorityStore<S, A>,
        ixs: &[usize],
        td_errs: &[f32],
    ) -> Result<(), ReplayError> {
        if ixs.len() != td_errs.len() {
            return Err(ReplayError::ContractViolation(format!(
                "{} indices but {} TD errors",
                ixs.len(),
                td_errs.len()
            )));
        }
        store.refresh_all(ixs, td_errs)
    }
}
