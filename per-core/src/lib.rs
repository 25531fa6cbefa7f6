#![warn(missing_docs)]
//! Prioritized experience replay for reinforcement learning.
//!
//! The crate provides a bounded store of transitions `(s, a, r, s', terminal)` that is
//! sampled in proportion to TD-error-based priorities, with importance weights that
//! correct for the sampling bias.
//!
//! # Key Components
//!
//! - [`PriorityStore`]: ring buffer of transitions with per-slot priorities
//! - [`ProportionalSampler`]: priority-proportional sampling with normalized importance weights
//! - [`PriorityRefresher`]: writes back priorities from new TD errors
//! - [`BetaScheduler`]: linear annealing of the importance sampling exponent
//! - [`BatchReplayCoordinator`]: a full replay cycle against a [`ValueFunction`]
//! - [`PrioritizedReplayBuffer`]: the above, driven by a training loop
//!
//! # Examples
//!
//! ```rust
//! use per_core::{
//!     PrioritizedReplayBuffer, PerConfig, ReplayConfig, TabularValueFunction, ValueFunction,
//! };
//!
//! let config = ReplayConfig::default()
//!     .capacity(1000)
//!     .batch_size(8)
//!     .per_config(PerConfig::default().alpha(0.6).beta_0(0.4).anneal_steps(100));
//! let mut buffer = PrioritizedReplayBuffer::<usize, usize>::build(&config).unwrap();
//! let mut q = TabularValueFunction::new(4, 2);
//!
//! // The initial TD error of (s=0, a=1, r=1, s'=1) under a zero table is 1.
//! buffer.add(0, 1, 1.0, 1, false, 1.0).unwrap();
//! let record = buffer.replay(&mut q).unwrap();
//!
//! assert!(q.value(&0, &1) > 0.0);
//! assert_eq!(record.get_scalar("beta").unwrap(), 0.4);
//! ```
pub mod error;
pub mod record;

mod buffer;
mod config;
mod coordinator;
mod random;
mod refresher;
mod sampler;
mod scheduler;
mod store;
mod transition;
mod value;

pub use buffer::{BufferSnapshot, PrioritizedReplayBuffer};
pub use config::{PerConfig, ReplayConfig};
pub use coordinator::{td_error, td_target, BatchReplayCoordinator};
pub use error::ReplayError;
pub use random::RandomSource;
pub use refresher::PriorityRefresher;
pub use sampler::{Draw, ProportionalSampler, WeightNormalizer};
pub use scheduler::BetaScheduler;
pub use store::{PriorityStore, StoreSnapshot};
pub use transition::Transition;
pub use value::{TabularValueFunction, ValueFunction};
