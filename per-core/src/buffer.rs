//! Prioritized replay buffer driven by a training loop.
use crate::{
    config::ReplayConfig,
    error::ReplayError,
    record::{Record, Recorder},
    store::StoreSnapshot,
    BatchReplayCoordinator, BetaScheduler, PriorityStore, RandomSource, ValueFunction,
};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Serializable state of a [`PrioritizedReplayBuffer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferSnapshot<S, A> {
    /// State of the priority store.
    pub store: StoreSnapshot<S, A>,

    /// State of the $\beta$ scheduler.
    pub scheduler: BetaScheduler,

    /// Environment steps counted by [`PrioritizedReplayBuffer::step`].
    pub env_steps: usize,

    /// Replay cycles performed.
    pub n_replays: usize,
}

/// Owns a [`PriorityStore`] and a [`BatchReplayCoordinator`].
///
/// A training loop calls [`PrioritizedReplayBuffer::add`] after every environment step,
/// followed by [`PrioritizedReplayBuffer::step`], which runs a replay cycle every
/// `replay_frequency` steps once the store holds at least `batch_size` transitions.
///
/// # Examples
///
/// ```rust
/// use per_core::{PrioritizedReplayBuffer, ReplayConfig, TabularValueFunction};
///
/// let config = ReplayConfig::default().capacity(100).batch_size(4).replay_frequency(1);
/// let mut buffer = PrioritizedReplayBuffer::<usize, usize>::build(&config).unwrap();
/// let mut q = TabularValueFunction::new(10, 4);
///
/// for t in 0..8 {
///     buffer.add(t, 0, 1.0, t + 1, false, 1.0).unwrap();
///     buffer.step(&mut q).unwrap();
/// }
/// assert_eq!(buffer.n_replays(), 5);
/// assert!((0..10).any(|s| q.row(s)[0] > 0.0));
/// ```
pub struct PrioritizedReplayBuffer<S, A, R = StdRng> {
    store: PriorityStore<S, A>,
    coordinator: BatchReplayCoordinator<R>,
    batch_size: usize,
    replay_frequency: usize,
    env_steps: usize,
    n_replays: usize,
}

impl<S, A> PrioritizedReplayBuffer<S, A, StdRng> {
    /// Builds a buffer sampling with [`StdRng`] seeded by `config.seed`.
    pub fn build(config: &ReplayConfig) -> Result<Self, ReplayError> {
        Self::build_with_rng(config, StdRng::seed_from_u64(config.seed))
    }
}

impl<S, A, R: RandomSource> PrioritizedReplayBuffer<S, A, R> {
    /// Builds a buffer sampling with the given random source.
    pub fn build_with_rng(config: &ReplayConfig, rng: R) -> Result<Self, ReplayError> {
        config.validate()?;
        let store = PriorityStore::from_config(config.capacity, &config.per_config)?;
        let coordinator = BatchReplayCoordinator::from_config(config, rng)?;
        info!(
            "Prioritized replay buffer: capacity={}, alpha={}, beta_0={}, anneal_steps={}",
            config.capacity,
            config.per_config.alpha,
            config.per_config.beta_0,
            config.per_config.anneal_steps
        );

        Ok(Self {
            store,
            coordinator,
            batch_size: config.batch_size,
            replay_frequency: config.replay_frequency,
            env_steps: 0,
            n_replays: 0,
        })
    }

    /// Adds a transition, overwriting the oldest one when the store is full.
    pub fn add(
        &mut self,
        state: S,
        action: A,
        reward: f32,
        next_state: S,
        terminal: bool,
        td_error: f32,
    ) -> Result<usize, ReplayError> {
        self.store
            .add(state, action, reward, next_state, terminal, td_error)
    }

    /// Performs a replay cycle with the configured batch size.
    ///
    /// Returns [`ReplayError::EmptyStore`], without any effect, if no transition was added.
    pub fn replay<V>(&mut self, value_fn: &mut V) -> Result<Record, ReplayError>
    where
        V: ValueFunction<State = S, Action = A>,
        S: Clone,
        A: Clone,
    {
        self.replay_with_size(value_fn, self.batch_size)
    }

    /// Performs a replay cycle of `batch_size` draws.
    pub fn replay_with_size<V>(
        &mut self,
        value_fn: &mut V,
        batch_size: usize,
    ) -> Result<Record, ReplayError>
    where
        V: ValueFunction<State = S, Action = A>,
        S: Clone,
        A: Clone,
    {
        match self.coordinator.replay(&mut self.store, value_fn, batch_size) {
            Ok(record) => {
                self.n_replays += 1;
                Ok(record)
            }
            Err(ReplayError::EmptyStore) => {
                warn!("Replay skipped: the store is empty");
                Err(ReplayError::EmptyStore)
            }
            Err(e) => Err(e),
        }
    }

    /// Counts an environment step and runs a replay cycle if one is due.
    ///
    /// A cycle is due every `replay_frequency` steps, provided the store holds at least
    /// `batch_size` transitions. Returns `Ok(None)` if no cycle ran.
    pub fn step<V>(&mut self, value_fn: &mut V) -> Result<Option<Record>, ReplayError>
    where
        V: ValueFunction<State = S, Action = A>,
        S: Clone,
        A: Clone,
    {
        self.env_steps += 1;
        if self.env_steps % self.replay_frequency != 0 || self.store.len() < self.batch_size {
            return Ok(None);
        }
        self.replay(value_fn).map(Some)
    }

    /// Same as [`PrioritizedReplayBuffer::step`], writing the record of the cycle to `recorder`.
    ///
    /// Returns `true` if a replay cycle ran.
    pub fn step_with_recorder<V, D>(
        &mut self,
        value_fn: &mut V,
        recorder: &mut D,
    ) -> Result<bool, ReplayError>
    where
        V: ValueFunction<State = S, Action = A>,
        D: Recorder,
        S: Clone,
        A: Clone,
    {
        match self.step(value_fn)? {
            Some(record) => {
                recorder.write(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S, A, R> PrioritizedReplayBuffer<S, A, R> {
    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no transition has been added.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Sum of priorities over stored transitions.
    pub fn total_priority(&self) -> f32 {
        self.store.total_priority()
    }

    /// Maximum priority over stored transitions.
    pub fn max_priority(&self) -> f32 {
        self.store.max_priority()
    }

    /// Current $\beta$.
    pub fn beta(&self) -> f32 {
        self.coordinator.beta()
    }

    /// The priority store.
    pub fn store(&self) -> &PriorityStore<S, A> {
        &self.store
    }

    /// The coordinator.
    pub fn coordinator(&self) -> &BatchReplayCoordinator<R> {
        &self.coordinator
    }

    /// Batch size of replay cycles.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Environment steps between replay cycles.
    pub fn replay_frequency(&self) -> usize {
        self.replay_frequency
    }

    /// Environment steps counted so far.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// Replay cycles performed so far.
    pub fn n_replays(&self) -> usize {
        self.n_replays
    }

    /// Restores the store, the $\beta$ schedule and the counters from a snapshot.
    ///
    /// On error the buffer is left unchanged.
    pub fn restore(&mut self, snapshot: BufferSnapshot<S, A>) -> Result<(), ReplayError> {
        let BufferSnapshot {
            store,
            scheduler,
            env_steps,
            n_replays,
        } = snapshot;
        let mut scheduler_ = BetaScheduler::new(
            scheduler.beta_0,
            scheduler.beta_final,
            scheduler.anneal_steps,
        )?;
        scheduler_.n_steps = scheduler.n_steps.min(scheduler.anneal_steps);
        let store = PriorityStore::from_snapshot(store)?;

        self.store = store;
        self.coordinator.set_scheduler(scheduler_);
        self.env_steps = env_steps;
        self.n_replays = n_replays;
        Ok(())
    }
}

impl<S: Clone, A: Clone, R> PrioritizedReplayBuffer<S, A, R> {
    /// Takes a snapshot of the buffer.
    pub fn snapshot(&self) -> BufferSnapshot<S, A> {
        BufferSnapshot {
            store: self.store.snapshot(),
            scheduler: self.coordinator.scheduler().clone(),
            env_steps: self.env_steps,
            n_replays: self.n_replays,
        }
    }
}
