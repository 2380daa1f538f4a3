//! Seeded random variates for simulation models.
//!
//! Every [`Random`] is an independent, reproducible stream: the same seed
//! always yields the same sequence of draws. Models typically own one
//! stream per source of randomness (arrivals, service times, ...) so that
//! changing one part of a model does not perturb the others.

use disco_types::{check_finite, InputError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;
use tracing::trace;

/// Mean above which [`Random::poisson`] switches to a normal approximation.
const POISSON_NORMAL_THRESHOLD: f64 = 30.0;

/// Tolerance on the sum of a probability vector.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// A seeded stream of random variates.
#[derive(Debug, Clone)]
pub struct Random {
    rng: ChaCha8Rng,
    seed: u64,
}

impl Random {
    /// Create a stream from a seed.
    pub fn new(seed: u64) -> Self {
        trace!(seed, "Random stream created");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform sample in `(0, 1]`, safe to take the logarithm of.
    fn open_unit(&mut self) -> f64 {
        1.0 - self.unit()
    }

    /// Uniformly distributed in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> Result<f64, InputError> {
        check_finite("lo", lo)?;
        check_finite("hi", hi)?;
        if lo >= hi {
            return Err(InputError::InvalidRange { lo, hi });
        }
        Ok(lo + (hi - lo) * self.unit())
    }

    /// Exponentially distributed with the given mean.
    pub fn exp(&mut self, mean: f64) -> Result<f64, InputError> {
        positive("mean", mean)?;
        Ok(-mean * self.open_unit().ln())
    }

    /// Exponentially distributed with the given rate (mean `1 / rate`).
    pub fn negexp(&mut self, rate: f64) -> Result<f64, InputError> {
        positive("rate", rate)?;
        Ok(-self.open_unit().ln() / rate)
    }

    /// Normally distributed (Box-Muller).
    pub fn normal(&mut self, mean: f64, sd: f64) -> Result<f64, InputError> {
        check_finite("mean", mean)?;
        check_finite("sd", sd)?;
        if sd < 0.0 {
            return Err(InputError::Negative {
                name: "sd",
                value: sd,
            });
        }
        let radius = (-2.0 * self.open_unit().ln()).sqrt();
        let angle = TAU * self.unit();
        Ok(mean + sd * radius * angle.cos())
    }

    /// `true` with probability `p`.
    ///
    /// `p <= 0` never succeeds and `p >= 1` always does. NaN is rejected.
    pub fn draw(&mut self, p: f64) -> Result<bool, InputError> {
        if p.is_nan() {
            return Err(InputError::NotFinite { name: "p", value: p });
        }
        Ok(self.unit() < p)
    }

    /// Uniformly distributed integer in `[lo, hi]`.
    pub fn randint(&mut self, lo: i64, hi: i64) -> Result<i64, InputError> {
        if lo > hi {
            return Err(InputError::InvalidRange {
                lo: lo as f64,
                hi: hi as f64,
            });
        }
        Ok(self.rng.gen_range(lo..=hi))
    }

    /// Erlang distributed: the sum of `k` exponential phases with total
    /// mean `mean`.
    pub fn erlang(&mut self, mean: f64, k: u32) -> Result<f64, InputError> {
        positive("mean", mean)?;
        if k == 0 {
            return Err(InputError::NonPositive {
                name: "k",
                value: 0.0,
            });
        }
        let product: f64 = (0..k).map(|_| self.open_unit()).product();
        Ok(-mean / f64::from(k) * product.ln())
    }

    /// Poisson distributed with the given mean.
    pub fn poisson(&mut self, mean: f64) -> Result<u64, InputError> {
        check_finite("mean", mean)?;
        if mean < 0.0 {
            return Err(InputError::Negative {
                name: "mean",
                value: mean,
            });
        }
        if mean > POISSON_NORMAL_THRESHOLD {
            let sample = self.normal(mean, mean.sqrt())?;
            return Ok(sample.round().max(0.0) as u64);
        }

        // Count uniform factors until their product drops below e^-mean.
        let limit = (-mean).exp();
        let mut product = self.unit();
        let mut count = 0;
        while product >= limit {
            product *= self.unit();
            count += 1;
        }
        Ok(count)
    }

    /// Index `i` drawn with probability `probabilities[i]`.
    ///
    /// The probabilities must be non-negative and sum to one.
    pub fn histd(&mut self, probabilities: &[f64]) -> Result<usize, InputError> {
        if probabilities.is_empty() {
            return Err(InputError::Empty {
                name: "probabilities",
            });
        }
        for (index, &value) in probabilities.iter().enumerate() {
            if value < 0.0 || value.is_nan() {
                return Err(InputError::NegativeProbability { index, value });
            }
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(InputError::ProbabilitiesDoNotSumToOne { sum });
        }

        let u = self.unit();
        let mut cumulative = 0.0;
        for (index, p) in probabilities.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return Ok(index);
            }
        }
        // Rounding left a sliver above the last cumulative value.
        Ok(probabilities
            .iter()
            .rposition(|&p| p > 0.0)
            .unwrap_or(probabilities.len() - 1))
    }

    /// Smallest index `i` with `u < cumulative[i]`, or `cumulative.len()` if
    /// there is none.
    ///
    /// `cumulative` is a non-decreasing table of cumulative probabilities.
    pub fn discrete(&mut self, cumulative: &[f64]) -> Result<usize, InputError> {
        if cumulative.is_empty() {
            return Err(InputError::Empty { name: "cumulative" });
        }
        for pair in cumulative.windows(2) {
            if pair[1] < pair[0] {
                return Err(InputError::InvalidRange {
                    lo: pair[0],
                    hi: pair[1],
                });
            }
        }
        let u = self.unit();
        Ok(cumulative
            .iter()
            .position(|&c| u < c)
            .unwrap_or(cumulative.len()))
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, InputError> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(InputError::NonPositive { name, value });
    }
    Ok(value)
}
