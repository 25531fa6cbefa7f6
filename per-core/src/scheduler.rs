//! Scheduling the exponent of importance weight for PER.
use crate::{config::PerConfig, error::ReplayError};
use serde::{Deserialize, Serialize};

/// Scheduler of the exponent of importance weight for PER.
///
/// $\beta$ grows linearly from `beta_0` to `beta_final` over `anneal_steps` calls of
/// [`BetaScheduler::advance`] and stays there. It is computed from the number of calls
/// rather than accumulated, so it hits `beta_final` exactly.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BetaScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Final value of $\beta$.
    pub beta_final: f32,

    /// Replay cycles when beta reaches its final value.
    pub anneal_steps: usize,

    /// Replay cycles so far, saturating at `anneal_steps`.
    pub n_steps: usize,
}

impl BetaScheduler {
    /// Upper bound of $\beta$.
    pub const BETA_MAX: f32 = 1.0;

    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_final: f32, anneal_steps: usize) -> Result<Self, ReplayError> {
        if anneal_steps == 0 {
            return Err(ReplayError::Configuration(
                "anneal_steps must be positive".to_string(),
            ));
        }
        if !(beta_0 > 0.0 && beta_0 <= beta_final && beta_final <= Self::BETA_MAX) {
            return Err(ReplayError::Configuration(format!(
                "expected 0 < beta_0 <= beta_final <= 1, got beta_0 = {}, beta_final = {}",
                beta_0, beta_final
            )));
        }

        Ok(Self {
            beta_0,
            beta_final,
            anneal_steps,
            n_steps: 0,
        })
    }

    /// Creates a scheduler with the parameters in `per_config`.
    pub fn from_config(per_config: &PerConfig) -> Result<Self, ReplayError> {
        Self::new(
            per_config.beta_0,
            per_config.beta_final,
            per_config.anneal_steps,
        )
    }

    /// Gets the exponent of importance sampling weight.
    pub fn beta(&self) -> f32 {
        if self.n_steps >= self.anneal_steps {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            let beta = self.beta_0 + d * (self.n_steps as f32 / self.anneal_steps as f32);
            beta.min(self.beta_final)
        }
    }

    /// Amount by which $\beta$ grows per call of [`BetaScheduler::advance`].
    pub fn increment(&self) -> f32 {
        (self.beta_final - self.beta_0) / self.anneal_steps as f32
    }

    /// Moves one replay cycle forward. A no-op once $\beta$ reached its final value.
    pub fn advance(&mut self) {
        if self.n_steps < self.anneal_steps {
            self.n_steps += 1;
        }
    }

    /// Returns `true` if $\beta$ reached its final value.
    pub fn is_annealed(&self) -> bool {
        self.n_steps >= self.anneal_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beta_annealing() {
        let mut scheduler = BetaScheduler::new(0.4, 1.0, 100).unwrap();
        assert_eq!(scheduler.beta(), 0.4);

        for _ in 0..50 {
            scheduler.advance();
        }
        assert!((scheduler.beta() - 0.7).abs() < 1e-6);

        for _ in 0..100 {
            scheduler.advance();
        }
        assert_eq!(scheduler.beta(), 1.0);
        assert!(scheduler.is_annealed());
    }

    #[test]
    fn test_beta_is_non_decreasing() {
        let mut scheduler = BetaScheduler::new(0.4, 1.0, 7).unwrap();
        let mut prev = scheduler.beta();
        for _ in 0..20 {
            scheduler.advance();
            let beta = scheduler.beta();
            assert!(beta >= prev);
            assert!(beta <= BetaScheduler::BETA_MAX);
            prev = beta;
        }
        assert_eq!(prev, 1.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BetaScheduler::new(0.4, 1.0, 0).is_err());
        assert!(BetaScheduler::new(0.0, 1.0, 10).is_err());
        assert!(BetaScheduler::new(0.4, 1.1, 10).is_err());
        assert!(BetaScheduler::new(0.8, 0.6, 10).is_err());
        assert!((BetaScheduler::new(0.4, 1.0, 100).unwrap().increment() - 0.006).abs() < 1e-7);
    }
}
