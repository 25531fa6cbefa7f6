//! Priority-proportional sampling with importance weights.
use crate::{
    config::PerConfig, error::ReplayError, PriorityStore, RandomSource, Transition,
};
use serde::{Deserialize, Serialize};

/// Normalization of importance weights.
///
/// Both methods keep every weight in `(0, 1]`, so weights only ever shrink update steps.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum WeightNormalizer {
    /// Divides by the maximum weight within the batch.
    Batch,

    /// Divides by the maximum weight any valid slot could get,
    /// i.e. the weight of the slot with the minimum priority.
    All,
}

/// A transition drawn from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Draw<S, A> {
    /// Slot of the transition in the store.
    pub slot: usize,

    /// Copy of the transition at the time of sampling.
    pub transition: Transition<S, A>,

    /// Normalized importance weight.
    pub weight: f32,
}

/// Draws slots with probability proportional to their priority.
///
/// For slot $i$ with priority $p_i$, the probability is $P(i) = p_i / \sum_j p_j$ and
/// the importance weight is $w_i = (N P(i))^{-\beta}$, where $N$ is the number of
/// valid slots. Weights are then normalized, see [`WeightNormalizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProportionalSampler {
    normalize: WeightNormalizer,
}

impl Default for ProportionalSampler {
    fn default() -> Self {
        Self::new(WeightNormalizer::Batch)
    }
}

fn check_beta(beta: f32) -> Result<(), ReplayError> {
    if beta.is_finite() && beta >= 0.0 {
        Ok(())
    } else {
        Err(ReplayError::ContractViolation(format!(
            "beta must be non-negative, got {}",
            beta
        )))
    }
}

impl ProportionalSampler {
    /// Creates a sampler.
    pub fn new(normalize: WeightNormalizer) -> Self {
        Self { normalize }
    }

    /// Creates a sampler with the normalizer in `per_config`.
    pub fn from_config(per_config: &PerConfig) -> Self {
        Self::new(per_config.normalize)
    }

    /// Normalization method of this sampler.
    pub fn normalizer(&self) -> WeightNormalizer {
        self.normalize
    }

    /// Unnormalized importance weight $(N P(i))^{-\beta}$ of `slot`.
    pub fn importance_weight<S, A>(
        store: &PriorityStore<S, A>,
        slot: usize,
        beta: f32,
    ) -> Result<f32, ReplayError> {
        check_beta(beta)?;
        let p = store.priority(slot).ok_or_else(|| {
            ReplayError::ContractViolation(format!(
                "slot {} is out of range, the store holds {} transitions",
                slot,
                store.len()
            ))
        })?;
        let n = store.len() as f32 / store.total_priority();
        Ok((n * p).powf(-beta))
    }

    /// Samples `batch_size` transitions with replacement.
    ///
    /// Each draw picks `u` uniformly in `[0, total_priority)` and takes the first slot
    /// whose cumulative priority reaches `u`. The store is not modified.
    ///
    /// Fails with [`ReplayError::EmptyStore`] if the store holds no transition.
    pub fn sample<S, A, R>(
        &self,
        store: &PriorityStore<S, A>,
        batch_size: usize,
        beta: f32,
        rng: &mut R,
    ) -> Result<Vec<Draw<S, A>>, ReplayError>
    where
        S: Clone,
        A: Clone,
        R: RandomSource + ?Sized,
    {
        if store.is_empty() {
            return Err(ReplayError::EmptyStore);
        }
        if batch_size == 0 {
            return Err(ReplayError::ContractViolation(
                "batch size must be positive".to_string(),
            ));
        }
        check_beta(beta)?;

        let p_sum = store.total_priority();
        if !p_sum.is_finite() || p_sum <= 0.0 {
            return Err(ReplayError::ContractViolation(format!(
                "total priority must be positive and finite, got {}",
                p_sum
            )));
        }
        let ixs = (0..batch_size)
            .map(|_| store.find(rng.uniform(0.0, p_sum)))
            .collect::<Vec<_>>();

        let n = store.len() as f32 / p_sum;
        let ws = ixs
            .iter()
            .map(|&ix| (n * store.leaf(ix)).powf(-beta))
            .collect::<Vec<_>>();

        let w_max = match self.normalize {
            WeightNormalizer::Batch => ws.iter().fold(f32::MIN_POSITIVE, |m, &w| w.max(m)),
            WeightNormalizer::All => (n * store.min_priority()).powf(-beta),
        };
        if !w_max.is_finite() {
            return Err(ReplayError::ContractViolation(format!(
                "maximum importance weight is not finite (beta = {})",
                beta
            )));
        }

        let draws = ixs
            .into_iter()
            .zip(ws.into_iter())
            .map(|(slot, w)| Draw {
                slot,
                transition: store.transitions[slot].clone(),
                // Rounding may push the ratio of equal weights over 1.
                weight: (w / w_max).min(1.0),
            })
            .collect::<Vec<_>>();

        Ok(draws)
    }
}
