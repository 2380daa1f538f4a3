//! Time-weighted statistics of a piecewise-constant signal.

use crate::format::{number, title_reset_obs};
use crate::Collector;
use disco_types::{check_finite, InputError, SimTime};

/// Time-weighted mean and deviation of a signal such as a queue length.
///
/// The signal holds its last value until the next [`update`](Self::update);
/// statistics are taken over `[reset_at, now]`.
#[derive(Debug, Clone)]
pub struct Accumulate {
    title: String,
    reset_at: SimTime,
    observations: u64,
    last_time: SimTime,
    last_value: f64,
    /// Integral of the signal since the reset, up to `last_time`.
    area: f64,
    /// Integral of the squared signal.
    area_sq: f64,
    min: f64,
    max: f64,
}

impl Accumulate {
    /// Start observing a signal that has value `initial` at `now`.
    pub fn new(title: &str, now: SimTime, initial: f64) -> Result<Self, InputError> {
        check_finite("now", now)?;
        check_finite("initial", initial)?;
        Ok(Self {
            title: crate::format::title(title),
            reset_at: now,
            observations: 0,
            last_time: now,
            last_value: initial,
            area: 0.0,
            area_sq: 0.0,
            min: initial,
            max: initial,
        })
    }

    /// The signal takes `value` from `now` on.
    ///
    /// `now` must not lie before the previous update.
    pub fn update(&mut self, now: SimTime, value: f64) -> Result<(), InputError> {
        check_finite("now", now)?;
        check_finite("value", value)?;
        if now < self.last_time {
            return Err(InputError::InvalidRange {
                lo: self.last_time,
                hi: now,
            });
        }
        let span = now - self.last_time;
        self.area += self.last_value * span;
        self.area_sq += self.last_value * self.last_value * span;
        self.last_time = now;
        self.last_value = value;
        self.observations += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }

    /// Current value of the signal.
    pub fn value(&self) -> f64 {
        self.last_value
    }

    /// Integrals of the signal and its square over `[reset_at, now]`.
    fn areas(&self, now: SimTime) -> (f64, f64) {
        let tail = (now - self.last_time).max(0.0);
        (
            self.area + self.last_value * tail,
            self.area_sq + self.last_value * self.last_value * tail,
        )
    }

    /// Time-weighted mean over `[reset_at, now]`.
    ///
    /// The current value if no time has passed.
    pub fn mean(&self, now: SimTime) -> f64 {
        let span = now - self.reset_at;
        if span <= 0.0 {
            return self.last_value;
        }
        self.areas(now).0 / span
    }

    /// Time-weighted standard deviation over `[reset_at, now]`.
    pub fn std_dev(&self, now: SimTime) -> f64 {
        let span = now - self.reset_at;
        if span <= 0.0 {
            return 0.0;
        }
        let (area, area_sq) = self.areas(now);
        let mean = area / span;
        (area_sq / span - mean * mean).max(0.0).sqrt()
    }

    /// Smallest value the signal took since the reset.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest value the signal took since the reset.
    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Collector for Accumulate {
    fn title(&self) -> &str {
        &self.title
    }

    fn observations(&self) -> u64 {
        self.observations
    }

    fn reset_at(&self) -> SimTime {
        self.reset_at
    }

    /// The signal keeps its current value.
    fn reset(&mut self, now: SimTime) {
        self.reset_at = now;
        self.last_time = now;
        self.observations = 0;
        self.area = 0.0;
        self.area_sq = 0.0;
        self.min = self.last_value;
        self.max = self.last_value;
    }

    fn report_lines(&self, now: SimTime) -> Vec<String> {
        let mut line = title_reset_obs(&self.title, self.reset_at, self.observations);
        for value in [self.mean(now), self.std_dev(now), self.min, self.max] {
            line.push_str(&number(value));
        }
        vec![line]
    }
}
