//! Kernel configuration.

use disco_types::InputError;

/// Numerical method used to advance continuous variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Explicit Euler. First order; mostly useful for comparison.
    Euler,

    /// Classical fourth-order Runge-Kutta.
    #[default]
    RungeKutta4,
}

/// Configuration of the continuous integrator.
#[derive(Clone, Debug)]
pub struct IntegratorConfig {
    /// Integration method.
    pub method: IntegrationMethod,

    /// Largest sub-step taken between two dispatch points.
    /// Bounds the local truncation error.
    pub max_step: f64,

    /// Smallest sub-step used while locating a state event.
    /// A `wait_until` condition is detected to within this resolution.
    pub min_step: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::default(),
            max_step: 0.1,
            min_step: 1e-6,
        }
    }
}

impl IntegratorConfig {
    /// Set the integration method.
    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the maximum sub-step.
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    /// Set the state-event resolution.
    pub fn with_min_step(mut self, min_step: f64) -> Self {
        self.min_step = min_step;
        self
    }

    /// Check `0 < min_step <= max_step`, both finite.
    pub fn validate(&self) -> Result<(), InputError> {
        for (name, value) in [("max_step", self.max_step), ("min_step", self.min_step)] {
            if !value.is_finite() {
                return Err(InputError::NotFinite { name, value });
            }
            if value <= 0.0 {
                return Err(InputError::NonPositive { name, value });
            }
        }
        if self.min_step > self.max_step {
            return Err(InputError::InvalidRange {
                lo: self.min_step,
                hi: self.max_step,
            });
        }
        Ok(())
    }
}

/// Configuration for a simulation run.
#[derive(Clone, Debug, Default)]
pub struct SimulationConfig {
    /// Continuous integrator settings.
    pub integrator: IntegratorConfig,

    /// Stop dispatching after this many events. `None` runs until the
    /// event list is empty.
    pub max_events: Option<u64>,
}

impl SimulationConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integrator configuration.
    pub fn with_integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = integrator;
        self
    }

    /// Set the maximum integration sub-step.
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.integrator.max_step = max_step;
        self
    }

    /// Limit the number of dispatched events.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), InputError> {
        self.integrator.validate()
    }
}
