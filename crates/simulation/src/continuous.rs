//! Continuous state and its numerical integration.
//!
//! A [`Variable`](VariableId) has a `state` and a `rate`. Each variable is
//! owned by one continuous (a [`ContinuousId`]) whose derivative function
//! writes the rates of its variables. All active continuous instances form
//! one coupled system: at every integration stage every active derivative
//! function runs against the same interpolated states, so a derivative may
//! read any variable, including those owned elsewhere.
//!
//! Stopping a continuous freezes its variables at their current values;
//! starting it again resumes from there.

use crate::config::{IntegrationMethod, IntegratorConfig};
use crate::ProgrammerError;
use disco_types::SimTime;
use std::fmt;

/// Handle to a continuous state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u32);

impl VariableId {
    /// Position of the variable in its simulation.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({})", self.0)
    }
}

/// Handle to a set of variables evolving under one derivative function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuousId(u32);

impl ContinuousId {
    /// Position of the continuous in its simulation.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContinuousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Continuous({})", self.0)
    }
}

/// Derivative function of a continuous.
pub type Derivatives = Box<dyn FnMut(&mut Rates<'_>)>;

/// What a derivative function sees during one evaluation.
pub struct Rates<'a> {
    time: SimTime,
    states: &'a [f64],
    rates: &'a mut [f64],
    owners: &'a [ContinuousId],
    writer: ContinuousId,
    foreign: Option<VariableId>,
}

impl Rates<'_> {
    /// Time of this evaluation (may lie between two dispatch points).
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// State of any variable at this evaluation. NaN for an unknown id.
    pub fn state(&self, variable: VariableId) -> f64 {
        self.states
            .get(variable.index())
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Set the rate of a variable owned by this continuous.
    ///
    /// Writing a variable owned elsewhere fails the integration step with
    /// [`ProgrammerError::ForeignRate`].
    pub fn set_rate(&mut self, variable: VariableId, rate: f64) {
        match self.owners.get(variable.index()) {
            Some(owner) if *owner == self.writer => self.rates[variable.index()] = rate,
            _ => {
                self.foreign.get_or_insert(variable);
            }
        }
    }
}

/// Read-only view of the continuous state, handed to `wait_until` conditions.
pub struct StateView<'a> {
    time: SimTime,
    states: &'a [f64],
}

impl<'a> StateView<'a> {
    pub(crate) fn new(time: SimTime, states: &'a [f64]) -> Self {
        Self { time, states }
    }

    /// Time at which the condition is evaluated.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// State of a variable. NaN for an unknown id.
    pub fn state(&self, variable: VariableId) -> f64 {
        self.states
            .get(variable.index())
            .copied()
            .unwrap_or(f64::NAN)
    }
}

/// Result of advancing the continuous system towards a target time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Advance {
    /// The target time was reached.
    Reached,
    /// A state condition became true at this time, before the target.
    Triggered(SimTime),
}

/// Integration counters.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StepCount {
    pub(crate) accepted: u64,
    pub(crate) rejected: u64,
}

struct ContinuousRecord {
    name: String,
    active: bool,
    /// Taken out while the function runs.
    derivatives: Option<Derivatives>,
}

/// Storage for all variables and continuous instances of one simulation.
///
/// Variables are kept as parallel vectors so a whole stage of the
/// integration is a handful of slice operations.
#[derive(Default)]
pub(crate) struct ContinuousSystem {
    states: Vec<f64>,
    rates: Vec<f64>,
    owners: Vec<ContinuousId>,
    continuous: Vec<ContinuousRecord>,
}

impl ContinuousSystem {
    pub(crate) fn add_continuous(&mut self, name: String, derivatives: Derivatives) -> ContinuousId {
        let id = ContinuousId(self.continuous.len() as u32);
        self.continuous.push(ContinuousRecord {
            name,
            active: false,
            derivatives: Some(derivatives),
        });
        id
    }

    pub(crate) fn set_derivatives(
        &mut self,
        id: ContinuousId,
        derivatives: Derivatives,
    ) -> Result<(), ProgrammerError> {
        let record = self
            .continuous
            .get_mut(id.index())
            .ok_or(ProgrammerError::UnknownContinuous { continuous: id })?;
        record.derivatives = Some(derivatives);
        Ok(())
    }

    /// Take every derivative function out, leaving the continuous inert.
    pub(crate) fn take_derivatives(&mut self) -> Vec<Derivatives> {
        self.continuous
            .iter_mut()
            .filter_map(|record| record.derivatives.take())
            .collect()
    }

    pub(crate) fn add_variable(
        &mut self,
        owner: ContinuousId,
        initial: f64,
    ) -> Result<VariableId, ProgrammerError> {
        self.record(owner)?;
        let id = VariableId(self.states.len() as u32);
        self.states.push(initial);
        self.rates.push(0.0);
        self.owners.push(owner);
        Ok(id)
    }

    fn record(&self, id: ContinuousId) -> Result<&ContinuousRecord, ProgrammerError> {
        self.continuous
            .get(id.index())
            .ok_or(ProgrammerError::UnknownContinuous { continuous: id })
    }

    fn check_variable(&self, id: VariableId) -> Result<usize, ProgrammerError> {
        if id.index() < self.states.len() {
            Ok(id.index())
        } else {
            Err(ProgrammerError::UnknownVariable { variable: id })
        }
    }

    pub(crate) fn name(&self, id: ContinuousId) -> Result<&str, ProgrammerError> {
        self.record(id).map(|r| r.name.as_str())
    }

    pub(crate) fn set_active(&mut self, id: ContinuousId, active: bool) -> Result<(), ProgrammerError> {
        let record = self
            .continuous
            .get_mut(id.index())
            .ok_or(ProgrammerError::UnknownContinuous { continuous: id })?;
        record.active = active;
        Ok(())
    }

    pub(crate) fn is_active(&self, id: ContinuousId) -> Result<bool, ProgrammerError> {
        self.record(id).map(|r| r.active)
    }

    pub(crate) fn owner(&self, id: VariableId) -> Result<ContinuousId, ProgrammerError> {
        let index = self.check_variable(id)?;
        Ok(self.owners[index])
    }

    pub(crate) fn state(&self, id: VariableId) -> Result<f64, ProgrammerError> {
        let index = self.check_variable(id)?;
        Ok(self.states[index])
    }

    pub(crate) fn set_state(&mut self, id: VariableId, value: f64) -> Result<(), ProgrammerError> {
        let index = self.check_variable(id)?;
        self.states[index] = value;
        Ok(())
    }

    pub(crate) fn rate(&self, id: VariableId) -> Result<f64, ProgrammerError> {
        let index = self.check_variable(id)?;
        Ok(self.rates[index])
    }

    pub(crate) fn states(&self) -> &[f64] {
        &self.states
    }

    /// Whether any variable takes part in integration.
    pub(crate) fn has_active_variables(&self) -> bool {
        self.owners
            .iter()
            .any(|owner| self.continuous[owner.index()].active)
    }

    fn active_mask(&self) -> Vec<bool> {
        self.owners
            .iter()
            .map(|owner| self.continuous[owner.index()].active)
            .collect()
    }

    /// Run every active derivative function against `stage`, writing `out`.
    fn evaluate(
        &mut self,
        time: SimTime,
        stage: &[f64],
        out: &mut [f64],
    ) -> Result<(), ProgrammerError> {
        for index in 0..self.continuous.len() {
            if !self.continuous[index].active {
                continue;
            }
            let Some(mut derivatives) = self.continuous[index].derivatives.take() else {
                continue;
            };
            let writer = ContinuousId(index as u32);
            let mut rates = Rates {
                time,
                states: stage,
                rates: &mut *out,
                owners: &self.owners,
                writer,
                foreign: None,
            };
            derivatives(&mut rates);
            let foreign = rates.foreign;
            self.continuous[index].derivatives = Some(derivatives);
            if let Some(variable) = foreign {
                return Err(ProgrammerError::ForeignRate { variable, writer });
            }
        }
        Ok(())
    }

    /// Refresh the stored rates from the current states.
    pub(crate) fn refresh_rates(&mut self, time: SimTime) -> Result<(), ProgrammerError> {
        let states = self.states.clone();
        let mut rates = self.rates.clone();
        self.evaluate(time, &states, &mut rates)?;
        self.rates = rates;
        Ok(())
    }

    /// One integration step of length `h` from `time`, without committing it.
    fn step(
        &mut self,
        time: SimTime,
        h: f64,
        method: IntegrationMethod,
        mask: &[bool],
    ) -> Result<Vec<f64>, ProgrammerError> {
        let y = self.states.clone();
        let n = y.len();
        let offset = |base: &[f64], k: &[f64], scale: f64| -> Vec<f64> {
            (0..n)
                .map(|i| if mask[i] { base[i] + scale * k[i] } else { base[i] })
                .collect()
        };

        let mut k1 = self.rates.clone();
        self.evaluate(time, &y, &mut k1)?;

        match method {
            IntegrationMethod::Euler => Ok(offset(&y, &k1, h)),
            IntegrationMethod::RungeKutta4 => {
                let mut k2 = k1.clone();
                self.evaluate(time + h / 2.0, &offset(&y, &k1, h / 2.0), &mut k2)?;
                let mut k3 = k2.clone();
                self.evaluate(time + h / 2.0, &offset(&y, &k2, h / 2.0), &mut k3)?;
                let mut k4 = k3.clone();
                self.evaluate(time + h, &offset(&y, &k3, h), &mut k4)?;

                Ok((0..n)
                    .map(|i| {
                        if mask[i] {
                            y[i] + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i])
                        } else {
                            y[i]
                        }
                    })
                    .collect())
            }
        }
    }

    /// Advance all active variables from `from` to `to`.
    ///
    /// After every sub-step `triggered` is asked whether a state condition
    /// now holds. If so, the sub-step is halved and retried until it is no
    /// longer than `min_step`, and the advance stops at the end of that
    /// sub-step.
    pub(crate) fn advance(
        &mut self,
        from: SimTime,
        to: SimTime,
        config: &IntegratorConfig,
        steps: &mut StepCount,
        mut triggered: impl FnMut(&StateView<'_>) -> bool,
    ) -> Result<Advance, ProgrammerError> {
        if to <= from || !self.has_active_variables() {
            return Ok(Advance::Reached);
        }
        let mask = self.active_mask();
        let mut time = from;
        let mut cap = config.max_step;

        while time < to {
            // Spread the remaining interval evenly over the fewest sub-steps
            // no longer than `cap`, so the last one lands exactly on `to`.
            let remaining = to - time;
            let count = (remaining / cap - 1e-9).ceil().max(1.0);
            // Far from the origin a sub-step can be smaller than the spacing
            // of representable times; it is then taken in one piece.
            let unresolvable = count > 1.0 && time + remaining / count <= time;
            let (h, next) = if count <= 1.0 || unresolvable {
                (remaining, to)
            } else {
                (remaining / count, time + remaining / count)
            };
            let candidate = self.step(time, h, config.method, &mask)?;

            if triggered(&StateView::new(next, &candidate)) {
                if h > config.min_step && !unresolvable {
                    steps.rejected += 1;
                    cap = h / 2.0;
                    continue;
                }
                steps.accepted += 1;
                self.states = candidate;
                self.refresh_rates(next)?;
                return Ok(Advance::Triggered(next));
            }

            steps.accepted += 1;
            self.states = candidate;
            time = next;
        }

        self.refresh_rates(to)?;
        Ok(Advance::Reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay(system: &mut ContinuousSystem, initial: f64) -> (ContinuousId, VariableId) {
        let slot = std::rc::Rc::new(std::cell::Cell::new(None::<VariableId>));
        let captured = slot.clone();
        let id = system.add_continuous(
            "decay".into(),
            Box::new(move |rates: &mut Rates<'_>| {
                if let Some(x) = captured.get() {
                    let state = rates.state(x);
                    rates.set_rate(x, -0.1 * state);
                }
            }),
        );
        let x = system.add_variable(id, initial).unwrap();
        slot.set(Some(x));
        (id, x)
    }

    #[test]
    fn test_inactive_system_does_not_move() {
        let mut system = ContinuousSystem::default();
        let (_, x) = decay(&mut system, 1.0);
        let mut steps = StepCount::default();
        let outcome = system
            .advance(0.0, 1.0, &IntegratorConfig::default(), &mut steps, |_| false)
            .unwrap();
        assert_eq!(outcome, Advance::Reached);
        assert_eq!(system.state(x).unwrap(), 1.0);
        assert_eq!(steps.accepted, 0);
    }

    #[test]
    fn test_rk4_exponential_decay() {
        let mut system = ContinuousSystem::default();
        let (id, x) = decay(&mut system, 1.0);
        system.set_active(id, true).unwrap();
        let mut steps = StepCount::default();
        system
            .advance(0.0, 1.0, &IntegratorConfig::default(), &mut steps, |_| false)
            .unwrap();

        let expected = (-0.1f64).exp();
        assert!((system.state(x).unwrap() - expected).abs() < 1e-9);
        assert!((system.rate(x).unwrap() + 0.1 * expected).abs() < 1e-9);
        assert_eq!(steps.accepted, 10);
    }

    #[test]
    fn test_euler_is_less_accurate_but_close() {
        let mut system = ContinuousSystem::default();
        let (id, x) = decay(&mut system, 1.0);
        system.set_active(id, true).unwrap();
        let config = IntegratorConfig::default().with_method(IntegrationMethod::Euler);
        system
            .advance(0.0, 1.0, &config, &mut StepCount::default(), |_| false)
            .unwrap();

        let error = (system.state(x).unwrap() - (-0.1f64).exp()).abs();
        assert!(error > 1e-6);
        assert!(error < 1e-2);
    }

    #[test]
    fn test_advance_far_from_origin_terminates() {
        let mut system = ContinuousSystem::default();
        let slot = std::rc::Rc::new(std::cell::Cell::new(None::<VariableId>));
        let captured = slot.clone();
        let id = system.add_continuous(
            "ramp".into(),
            Box::new(move |rates: &mut Rates<'_>| {
                if let Some(x) = captured.get() {
                    rates.set_rate(x, 1.0);
                }
            }),
        );
        let x = system.add_variable(id, 0.0).unwrap();
        slot.set(Some(x));
        system.set_active(id, true).unwrap();

        // 0.1 is below the spacing of f64 values near 1e17.
        let from = 1e17;
        let mut steps = StepCount::default();
        let outcome = system
            .advance(from, from + 64.0, &IntegratorConfig::default(), &mut steps, |_| false)
            .unwrap();
        assert_eq!(outcome, Advance::Reached);
        assert!((system.state(x).unwrap() - 64.0).abs() < 1e-9);
        assert!(steps.accepted >= 1);

        let outcome = system
            .advance(
                from + 64.0,
                from + 128.0,
                &IntegratorConfig::default(),
                &mut steps,
                |view| view.state(x) >= 100.0,
            )
            .unwrap();
        assert!(matches!(outcome, Advance::Triggered(at) if at > from + 64.0 && at <= from + 128.0));
    }

    #[test]
    fn test_state_event_is_located() {
        let mut system = ContinuousSystem::default();
        let slot = std::rc::Rc::new(std::cell::Cell::new(None::<VariableId>));
        let captured = slot.clone();
        let id = system.add_continuous(
            "ramp".into(),
            Box::new(move |rates: &mut Rates<'_>| {
                if let Some(x) = captured.get() {
                    rates.set_rate(x, 1.0);
                }
            }),
        );
        let x = system.add_variable(id, 0.0).unwrap();
        slot.set(Some(x));
        system.set_active(id, true).unwrap();

        let config = IntegratorConfig::default().with_min_step(1e-4);
        let mut steps = StepCount::default();
        let outcome = system
            .advance(0.0, 10.0, &config, &mut steps, |view| view.state(x) >= 0.55)
            .unwrap();

        let Advance::Triggered(at) = outcome else {
            panic!("condition should trigger before the target");
        };
        assert!(at > 0.55 - 1e-9 && at < 0.55 + 1e-4 + 1e-9, "triggered at {}", at);
        assert!(steps.rejected > 0);
    }

    #[test]
    fn test_foreign_rate_is_rejected() {
        let mut system = ContinuousSystem::default();
        let (_, x) = decay(&mut system, 1.0);
        let intruder = system.add_continuous(
            "intruder".into(),
            Box::new(move |rates: &mut Rates<'_>| rates.set_rate(x, 5.0)),
        );
        system.set_active(intruder, true).unwrap();
        // The intruder owns no variables, so give it one to be active.
        system.add_variable(intruder, 0.0).unwrap();

        let result = system.advance(
            0.0,
            1.0,
            &IntegratorConfig::default(),
            &mut StepCount::default(),
            |_| false,
        );
        assert_eq!(
            result,
            Err(ProgrammerError::ForeignRate {
                variable: x,
                writer: intruder
            })
        );
    }
}
