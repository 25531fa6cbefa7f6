//! Configuration of the replay engine.
//!
//! This module provides configuration structures for prioritized experience replay:
//! - [`PerConfig`] for the priority store, the sampler and the $\beta$ scheduler
//! - [`ReplayConfig`] for the replay buffer as seen from a training loop
//!
//! Both can be serialized; [`ReplayConfig`] can be loaded from and saved to YAML files.
use crate::{error::ReplayError, WeightNormalizer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration for Prioritized Experience Replay (PER).
///
/// # Examples
///
/// ```rust
/// use per_core::{PerConfig, WeightNormalizer};
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .anneal_steps(100_000)
///     .normalize(WeightNormalizer::Batch);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization in `[0, 1]`. A value of 0 results in uniform sampling,
    /// 1 samples fully in proportion to `|td_error| + floor`.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Final value of the importance sampling exponent, at most 1.0.
    pub beta_final: f32,

    /// Number of replay cycles after which `beta` reaches `beta_final`.
    pub anneal_steps: usize,

    /// Small positive constant added to `|td_error|` so that no transition
    /// has zero probability of being sampled.
    pub priority_floor: f32,

    /// Method for normalizing importance sampling weights.
    pub normalize: WeightNormalizer,
}

impl Default for PerConfig {
    /// - `alpha = 0.6`
    /// - `beta_0 = 0.4`
    /// - `beta_final = 1.0`
    /// - `anneal_steps = 100_000`
    /// - `priority_floor = 1e-6`
    /// - `normalize = Batch`
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            anneal_steps: 100_000,
            priority_floor: 1e-6,
            normalize: WeightNormalizer::Batch,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final importance sampling exponent `beta_final`.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of replay cycles to reach `beta_final`.
    pub fn anneal_steps(mut self, anneal_steps: usize) -> Self {
        self.anneal_steps = anneal_steps;
        self
    }

    /// Sets the priority floor.
    pub fn priority_floor(mut self, priority_floor: f32) -> Self {
        self.priority_floor = priority_floor;
        self
    }

    /// Sets the method for normalizing importance weights.
    pub fn normalize(mut self, normalize: WeightNormalizer) -> Self {
        self.normalize = normalize;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ReplayError> {
        let err = |msg: String| Err(ReplayError::Configuration(msg));

        if !(0.0..=1.0).contains(&self.alpha) {
            return err(format!("alpha must be in [0, 1], got {}", self.alpha));
        }
        if !self.beta_final.is_finite() || self.beta_final > 1.0 {
            return err(format!("beta_final must not exceed 1.0, got {}", self.beta_final));
        }
        if !self.beta_0.is_finite() || self.beta_0 <= 0.0 || self.beta_0 > self.beta_final {
            return err(format!(
                "beta_0 must be in (0, beta_final], got {} (beta_final = {})",
                self.beta_0, self.beta_final
            ));
        }
        if self.anneal_steps == 0 {
            return err("anneal_steps must be positive".to_string());
        }
        if !self.priority_floor.is_finite() || self.priority_floor <= 0.0 {
            return err(format!(
                "priority_floor must be positive, got {}",
                self.priority_floor
            ));
        }
        Ok(())
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](crate::PrioritizedReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use per_core::{PerConfig, ReplayConfig};
///
/// let config = ReplayConfig::default()
///     .capacity(1000)
///     .batch_size(16)
///     .seed(42)
///     .per_config(PerConfig::default().anneal_steps(100));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayConfig {
    /// Maximum number of transitions. When the store is full,
    /// new transitions replace the oldest ones.
    pub capacity: usize,

    /// Number of transitions drawn in each replay cycle.
    pub batch_size: usize,

    /// Environment steps between replay cycles.
    pub replay_frequency: usize,

    /// Discount factor of TD targets.
    pub discount_factor: f32,

    /// Base learning rate, scaled by the importance weight of each draw.
    pub learning_rate: f32,

    /// Random seed used for sampling.
    pub seed: u64,

    /// Configuration of prioritization.
    pub per_config: PerConfig,
}

impl Default for ReplayConfig {
    /// - `capacity = 10_000`
    /// - `batch_size = 32`
    /// - `replay_frequency = 4`
    /// - `discount_factor = 0.9`
    /// - `learning_rate = 0.1`
    /// - `seed = 42`
    fn default() -> Self {
        Self {
            capacity: 10_000,
            batch_size: 32,
            replay_frequency: 4,
            discount_factor: 0.9,
            learning_rate: 0.1,
            seed: 42,
            per_config: PerConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Sets the capacity of the store.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of environment steps between replay cycles.
    pub fn replay_frequency(mut self, replay_frequency: usize) -> Self {
        self.replay_frequency = replay_frequency;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, discount_factor: f32) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    /// Sets the base learning rate.
    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration of prioritization.
    pub fn per_config(mut self, per_config: PerConfig) -> Self {
        self.per_config = per_config;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ReplayError> {
        let err = |msg: String| Err(ReplayError::Configuration(msg));

        if self.capacity == 0 {
            return err("capacity must be positive".to_string());
        }
        if self.batch_size == 0 {
            return err("batch_size must be positive".to_string());
        }
        if self.replay_frequency == 0 {
            return err("replay_frequency must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return err(format!(
                "discount_factor must be in [0, 1], got {}",
                self.discount_factor
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        self.per_config.validate()
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_replay_config() -> Result<()> {
        let config = ReplayConfig::default()
            .capacity(1000)
            .batch_size(16)
            .seed(7)
            .per_config(PerConfig::default().alpha(0.7).anneal_steps(500));

        let dir = TempDir::new("replay_config")?;
        let path = dir.path().join("replay_config.yaml");
        config.save(&path)?;
        let config_ = ReplayConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ReplayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let invalid = vec![
            ReplayConfig::default().capacity(0),
            ReplayConfig::default().batch_size(0),
            ReplayConfig::default().replay_frequency(0),
            ReplayConfig::default().discount_factor(1.5),
            ReplayConfig::default().learning_rate(0.0),
            ReplayConfig::default().per_config(PerConfig::default().anneal_steps(0)),
            ReplayConfig::default().per_config(PerConfig::default().priority_floor(0.0)),
            ReplayConfig::default().per_config(PerConfig::default().alpha(-0.1)),
            ReplayConfig::default().per_config(PerConfig::default().alpha(1.5)),
            ReplayConfig::default().per_config(PerConfig::default().alpha(f32::NAN)),
            ReplayConfig::default().per_config(PerConfig::default().beta_0(0.0)),
            ReplayConfig::default().per_config(PerConfig::default().beta_final(1.2)),
            ReplayConfig::default().per_config(PerConfig::default().beta_0(0.9).beta_final(0.8)),
        ];

        for config in invalid.iter() {
            match config.validate() {
                Err(ReplayError::Configuration(_)) => {}
                r => panic!("{:?} was accepted: {:?}", config, r),
            }
        }
    }
}
