//! Statistics of independent samples.

use crate::format::{number, title_reset_obs};
use crate::Collector;
use disco_types::{check_finite, InputError, SimTime};

/// Two-sided 95 % quantile of the standard normal distribution.
const Z_95: f64 = 1.96;

/// Mean, standard deviation and extremes of a series of samples.
#[derive(Debug, Clone)]
pub struct Tally {
    title: String,
    reset_at: SimTime,
    observations: u64,
    mean: f64,
    /// Sum of squared deviations from the running mean (Welford).
    m2: f64,
    min: f64,
    max: f64,
}

impl Tally {
    /// Create an empty tally. `now` is recorded as the reset time.
    pub fn new(title: &str, now: SimTime) -> Self {
        Self {
            title: crate::format::title(title),
            reset_at: now,
            observations: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Record a sample.
    pub fn update(&mut self, value: f64) -> Result<(), InputError> {
        check_finite("value", value)?;
        self.observations += 1;
        let delta = value - self.mean;
        self.mean += delta / self.observations as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }

    /// Sample mean. Zero without samples.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation. Zero with fewer than two samples.
    pub fn std_dev(&self) -> f64 {
        if self.observations < 2 {
            return 0.0;
        }
        (self.m2 / (self.observations - 1) as f64).sqrt()
    }

    /// Smallest sample, if any.
    pub fn min(&self) -> Option<f64> {
        (self.observations > 0).then_some(self.min)
    }

    /// Largest sample, if any.
    pub fn max(&self) -> Option<f64> {
        (self.observations > 0).then_some(self.max)
    }

    /// Half-width of the 95 % confidence interval of the mean.
    pub fn confidence(&self) -> f64 {
        if self.observations < 2 {
            return 0.0;
        }
        Z_95 * self.std_dev() / (self.observations as f64).sqrt()
    }

    /// The summary line, shared with [`Histogram`](crate::Histogram).
    pub(crate) fn summary_line(&self) -> String {
        let mut line = title_reset_obs(&self.title, self.reset_at, self.observations);
        if self.observations == 0 {
            line.push_str("  no entries");
            return line;
        }
        for value in [
            self.mean(),
            self.std_dev(),
            self.min,
            self.max,
            self.confidence(),
        ] {
            line.push_str(&number(value));
        }
        line
    }
}

impl Collector for Tally {
    fn title(&self) -> &str {
        &self.title
    }

    fn observations(&self) -> u64 {
        self.observations
    }

    fn reset_at(&self) -> SimTime {
        self.reset_at
    }

    fn reset(&mut self, now: SimTime) {
        *self = Self {
            title: std::mem::take(&mut self.title),
            ..Self::new("", now)
        };
    }

    fn report_lines(&self, _now: SimTime) -> Vec<String> {
        vec![self.summary_line()]
    }
}
