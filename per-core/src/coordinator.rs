//! One replay cycle over the priority store.
use crate::{
    config::ReplayConfig,
    error::ReplayError,
    record::{Record, RecordValue::Scalar},
    BetaScheduler, PriorityRefresher, PriorityStore, ProportionalSampler, RandomSource,
    Transition, ValueFunction,
};
use log::debug;

/// TD target $r + \gamma \max_a Q(s', a)$ of a transition.
///
/// The bootstrap term is dropped if `s'` is terminal.
pub fn td_target<V: ValueFunction>(
    value_fn: &V,
    tr: &Transition<V::State, V::Action>,
    discount_factor: f32,
) -> f32 {
    if tr.is_terminal() {
        tr.reward
    } else {
        tr.reward + discount_factor * value_fn.max_value(&tr.next_state)
    }
}

/// TD error $r + \gamma \max_a Q(s', a) - Q(s, a)$ of a transition.
pub fn td_error<V: ValueFunction>(
    value_fn: &V,
    tr: &Transition<V::State, V::Action>,
    discount_factor: f32,
) -> f32 {
    td_target(value_fn, tr, discount_factor) - value_fn.value(&tr.state, &tr.action)
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs replay cycles: sample, learn, refresh priorities and anneal $\beta$.
///
/// # Replay cycle
///
/// [`BatchReplayCoordinator::replay`] performs the following steps:
///
/// 1. Draw a batch from the store with [`ProportionalSampler`] using the current $\beta$.
///    If the store is empty, return [`ReplayError::EmptyStore`] without any effect.
/// 2. For each draw, compute the TD target `r + γ max_a Q(s', a)` (without the bootstrap
///    term for terminal transitions) and move `Q(s, a)` toward it with step size
///    `learning_rate * weight`.
/// 3. Recompute the TD error of every draw against the updated value function and
///    write the new priorities back with [`PriorityRefresher`].
/// 4. Advance [`BetaScheduler`].
///
/// ```mermaid
/// graph LR
///     A[PriorityStore]-->|Draw|B[ProportionalSampler]
///     B -->|weighted TD step|C[ValueFunction]
///     C -->|new TD errors|D[PriorityRefresher]
///     D -->|priorities|A
///     E[BetaScheduler]-->|beta|B
/// ```
///
/// The store and the value function are borrowed mutably for the whole cycle,
/// so no transition can be added or refreshed in between.
#[derive(Debug, Clone)]
pub struct BatchReplayCoordinator<R> {
    sampler: ProportionalSampler,
    refresher: PriorityRefresher,
    scheduler: BetaScheduler,
    rng: R,
    discount_factor: f32,
    learning_rate: f32,
}

impl<R: RandomSource> BatchReplayCoordinator<R> {
    /// Creates a coordinator.
    pub fn new(
        sampler: ProportionalSampler,
        scheduler: BetaScheduler,
        rng: R,
        discount_factor: f32,
        learning_rate: f32,
    ) -> Result<Self, ReplayError> {
        if !(0.0..=1.0).contains(&discount_factor) {
            return Err(ReplayError::Configuration(format!(
                "discount_factor must be in [0, 1], got {}",
                discount_factor
            )));
        }
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ReplayError::Configuration(format!(
                "learning_rate must be positive, got {}",
                learning_rate
            )));
        }

        Ok(Self {
            sampler,
            refresher: PriorityRefresher::new(),
            scheduler,
            rng,
            discount_factor,
            learning_rate,
        })
    }

    /// Creates a coordinator from the configuration.
    pub fn from_config(config: &ReplayConfig, rng: R) -> Result<Self, ReplayError> {
        config.validate()?;
        Self::new(
            ProportionalSampler::from_config(&config.per_config),
            BetaScheduler::from_config(&config.per_config)?,
            rng,
            config.discount_factor,
            config.learning_rate,
        )
    }

    /// Performs a replay cycle of `batch_size` draws.
    ///
    /// Returns diagnostics of the cycle:
    /// * `"beta"` - $\beta$ used for the importance weights
    /// * `"batch_size"` - number of draws
    /// * `"mean_abs_td_error"` - mean |TD error| before the update
    /// * `"mean_abs_td_error_after"` - mean |TD error| after the update
    /// * `"mean_weight"` - mean normalized importance weight
    /// * `"total_priority"` - sum of priorities after refresh
    pub fn replay<V>(
        &mut self,
        store: &mut PriorityStore<V::State, V::Action>,
        value_fn: &mut V,
        batch_size: usize,
    ) -> Result<Record, ReplayError>
    where
        V: ValueFunction,
        V::State: Clone,
        V::Action: Clone,
    {
        let beta = self.scheduler.beta();
        let draws = self
            .sampler
            .sample(store, batch_size, beta, &mut self.rng)?;

        // Weighted TD steps
        let mut abs_td_err_sum = 0f32;
        let mut weight_sum = 0f32;
        for draw in draws.iter() {
            let tr = &draw.transition;
            let target = td_target(value_fn, tr, self.discount_factor);
            let td_err = target - value_fn.value(&tr.state, &tr.action);
            value_fn.update(&tr.state, &tr.action, target, self.learning_rate * draw.weight);
            abs_td_err_sum += td_err.abs();
            weight_sum += draw.weight;
        }

        // Priorities from the updated value function
        let ixs = draws.iter().map(|d| d.slot).collect::<Vec<_>>();
        let td_errs = draws
            .iter()
            .map(|d| td_error(value_fn, &d.transition, self.discount_factor))
            .collect::<Vec<_>>();
        self.refresher.refresh_batch(store, &ixs, &td_errs)?;

        self.scheduler.advance();

        let n = draws.len() as f32;
        let abs_td_err_after = td_errs.iter().map(|e| e.abs()).sum::<f32>() / n;
        debug!(
            "replay: batch_size={}, beta={}, |td_err| {} -> {}",
            draws.len(),
            beta,
            abs_td_err_sum / n,
            abs_td_err_after
        );

        let mut record = Record::empty();
        record.insert("beta", Scalar(beta));
        record.insert("batch_size", Scalar(n));
        record.insert("mean_abs_td_error", Scalar(abs_td_err_sum / n));
        record.insert("mean_abs_td_error_after", Scalar(abs_td_err_after));
        record.insert("mean_weight", Scalar(weight_sum / n));
        record.insert("total_priority", Scalar(store.total_priority()));
        Ok(record)
    }
}

impl<R> BatchReplayCoordinator<R> {
    /// Current $\beta$.
    pub fn beta(&self) -> f32 {
        self.scheduler.beta()
    }

    /// The $\beta$ scheduler.
    pub fn scheduler(&self) -> &BetaScheduler {
        &self.scheduler
    }

    /// Replaces the $\beta$ scheduler, e.g., when resuming from a snapshot.
    pub fn set_scheduler(&mut self, scheduler: BetaScheduler) {
        self.scheduler = scheduler;
    }

    /// The sampler.
    pub fn sampler(&self) -> &ProportionalSampler {
        &self.sampler
    }

    /// Discount factor of TD targets.
    pub fn discount_factor(&self) -> f32 {
        self.discount_factor
    }

    /// Base learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
