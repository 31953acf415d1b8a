//! Stochastic event-count sampling for discrete per-cell processes.
//!
//! Given a population of `n` individuals each experiencing an event with
//! probability `p`, the exact count is Binomial(n, p). For large expected
//! counts the Poisson approximation with mean `n * p` is used instead.
//! The switch point and both distributions are fixed so that runs with
//! the same seed draw the same sequence.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Poisson};

/// Expected count above which the Poisson approximation is used.
pub const POISSON_THRESHOLD: f64 = 10.0;

/// Draw the number of events among `population` trials of probability
/// `prob`.
///
/// - `population == 0` or `prob <= 0` (or NaN) draws nothing and yields 0.
/// - `prob >= 1` yields `population` without drawing.
/// - `population * prob > 10` samples Poisson(population * prob).
/// - otherwise samples Binomial(population, prob).
pub fn sample_population<R: Rng + ?Sized>(rng: &mut R, population: u64, prob: f64) -> u64 {
    if population == 0 || prob.is_nan() || prob <= 0.0 {
        return 0;
    }
    if prob >= 1.0 {
        return population;
    }
    let mean = population as f64 * prob;
    if mean > POISSON_THRESHOLD {
        match Poisson::new(mean) {
            Ok(dist) => dist.sample(rng) as u64,
            // Only reachable for means beyond the sampler's range, where
            // the mean itself is the best available answer.
            Err(_) => mean.round() as u64,
        }
    } else {
        match Binomial::new(population, prob) {
            Ok(dist) => dist.sample(rng),
            Err(_) => 0,
        }
    }
}
