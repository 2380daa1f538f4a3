//! Configuration types for the example models.

use disco_simulation::{IntegratorConfig, SimulationConfig};
use disco_types::{check_finite, InputError, SimTime};

/// Settings shared by every model run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Seed of the first random stream; further streams use `seed + 1`, ...
    pub seed: u64,

    /// Simulated time at which the run stops.
    pub horizon: SimTime,

    /// Kernel settings.
    pub simulation: SimulationConfig,
}

impl SimulatorConfig {
    /// Create a configuration running until `horizon`.
    pub fn new(horizon: SimTime) -> Self {
        Self {
            seed: 12345,
            horizon,
            simulation: SimulationConfig::default(),
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the integrator used by continuous models.
    pub fn with_integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.simulation = self.simulation.with_integrator(integrator);
        self
    }

    /// Stop after this many dispatched events.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.simulation = self.simulation.with_max_events(max_events);
        self
    }

    pub fn validate(&self) -> Result<(), InputError> {
        positive("horizon", self.horizon)?;
        self.simulation.validate()
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

/// Parameters of the bank (M/M/c) model.
#[derive(Clone, Debug)]
pub struct BankConfig {
    /// Number of tellers serving the single waiting line.
    pub tellers: usize,

    /// Mean time between customer arrivals.
    pub mean_interarrival: f64,

    /// Mean service time of one customer.
    pub mean_service: f64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            tellers: 2,
            mean_interarrival: 1.0,
            mean_service: 1.6,
        }
    }
}

impl BankConfig {
    /// Set the number of tellers.
    pub fn with_tellers(mut self, tellers: usize) -> Self {
        self.tellers = tellers;
        self
    }

    /// Set the mean interarrival time.
    pub fn with_mean_interarrival(mut self, mean: f64) -> Self {
        self.mean_interarrival = mean;
        self
    }

    /// Set the mean service time.
    pub fn with_mean_service(mut self, mean: f64) -> Self {
        self.mean_service = mean;
        self
    }

    /// Offered load per teller, `rho = service / (interarrival * tellers)`.
    pub fn utilization(&self) -> f64 {
        self.mean_service / (self.mean_interarrival * self.tellers as f64)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.tellers == 0 {
            return Err(InputError::NonPositive {
                name: "tellers",
                value: 0.0,
            });
        }
        positive("mean_interarrival", self.mean_interarrival)?;
        positive("mean_service", self.mean_service)?;
        Ok(())
    }
}

/// Parameters of the tank model.
///
/// The tank fills at `inflow`. Once the level reaches `high_mark` the drain
/// opens and the level falls at `outflow - inflow` until it reaches
/// `low_mark`, where the drain closes again.
#[derive(Clone, Debug)]
pub struct TankConfig {
    /// Level at the start of the run.
    pub initial_level: f64,

    /// Constant inflow rate.
    pub inflow: f64,

    /// Drain rate while the drain is open. Must exceed `inflow`.
    pub outflow: f64,

    /// Level at which the drain opens.
    pub high_mark: f64,

    /// Level at which the drain closes.
    pub low_mark: f64,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            initial_level: 0.0,
            inflow: 2.0,
            outflow: 5.0,
            high_mark: 10.0,
            low_mark: 1.0,
        }
    }
}

impl TankConfig {
    /// Set the inflow rate.
    pub fn with_inflow(mut self, inflow: f64) -> Self {
        self.inflow = inflow;
        self
    }

    /// Set the drain rate.
    pub fn with_outflow(mut self, outflow: f64) -> Self {
        self.outflow = outflow;
        self
    }

    /// Set the marks at which the drain closes and opens.
    pub fn with_marks(mut self, low: f64, high: f64) -> Self {
        self.low_mark = low;
        self.high_mark = high;
        self
    }

    /// Length of one fill/drain cycle once the level oscillates between
    /// the marks.
    pub fn cycle_time(&self) -> f64 {
        let swing = self.high_mark - self.low_mark;
        swing / self.inflow + swing / (self.outflow - self.inflow)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        check_finite("initial_level", self.initial_level)?;
        positive("inflow", self.inflow)?;
        if self.outflow <= self.inflow {
            return Err(InputError::InvalidRange {
                lo: self.inflow,
                hi: self.outflow,
            });
        }
        check_finite("low_mark", self.low_mark)?;
        check_finite("high_mark", self.high_mark)?;
        if self.low_mark >= self.high_mark {
            return Err(InputError::InvalidRange {
                lo: self.low_mark,
                hi: self.high_mark,
            });
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), InputError> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(InputError::NonPositive { name, value });
    }
    Ok(())
}
