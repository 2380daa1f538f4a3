//! Tank filled continuously and drained by a controller.
//!
//! The level is a continuous variable. A controller process waits until the
//! level reaches the high mark, opens the drain, waits until it falls to the
//! low mark, closes the drain, and repeats. Both marks are state events
//! located by the integrator.

use crate::config::{SimulatorConfig, TankConfig};
use disco_simulation::{
    ProcessContext, Rates, SimError, SimulationRunner, SimulationStats, VariableId,
};
use disco_stats::{report_all, Accumulate, Count, Tally};
use disco_types::SimTime;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

/// Observations made by the controller.
struct Controller {
    drain: Rc<Cell<bool>>,
    last_opened: Option<SimTime>,
    cycles: Count,
    cycle_time: Tally,
    draining: Accumulate,
}

type Shared = Rc<RefCell<Controller>>;

async fn controller(
    cx: ProcessContext,
    state: Shared,
    level: VariableId,
    config: TankConfig,
) -> Result<(), SimError> {
    let TankConfig {
        high_mark,
        low_mark,
        ..
    } = config;
    loop {
        cx.wait_until(move |v| v.state(level) >= high_mark).await?;
        {
            let mut state = state.borrow_mut();
            let now = cx.now();
            state.drain.set(true);
            state.draining.update(now, 1.0)?;
            if let Some(opened) = state.last_opened.replace(now) {
                state.cycle_time.update(now - opened)?;
            }
        }
        let reached = cx.state(level)?;
        debug!(time = cx.now(), level = reached, "Drain opened");

        cx.wait_until(move |v| v.state(level) <= low_mark).await?;
        {
            let mut state = state.borrow_mut();
            state.drain.set(false);
            state.draining.update(cx.now(), 0.0)?;
            state.cycles.increment();
        }
        let reached = cx.state(level)?;
        debug!(time = cx.now(), level = reached, "Drain closed");
    }
}

/// Outcome of a tank run.
#[derive(Debug, Clone)]
pub struct TankReport {
    /// Simulated time at which the run stopped.
    pub end_time: SimTime,
    /// Level at the end of the run.
    pub final_level: f64,
    /// Completed fill/drain cycles.
    pub cycles: Count,
    /// Time between consecutive drain openings.
    pub cycle_time: Tally,
    /// Whether the drain is open, over time.
    pub draining: Accumulate,
    /// Kernel counters.
    pub stats: SimulationStats,
}

impl TankReport {
    /// Log the collector reports.
    pub fn log(&self) {
        report_all(
            &[&self.cycles, &self.cycle_time, &self.draining],
            self.end_time,
        );
    }
}

/// Run the tank model until the configured horizon.
pub fn run_tank(config: &SimulatorConfig, tank: &TankConfig) -> Result<TankReport, SimError> {
    config.validate()?;
    tank.validate()?;
    info!(
        horizon = config.horizon,
        inflow = tank.inflow,
        outflow = tank.outflow,
        low = tank.low_mark,
        high = tank.high_mark,
        "Starting tank model"
    );

    let mut sim = SimulationRunner::new(config.simulation.clone())?;
    let drain = Rc::new(Cell::new(false));

    let continuous = sim.new_continuous("tank", |_| {});
    let level = sim.new_variable(continuous, tank.initial_level)?;
    sim.set_derivatives(continuous, {
        let drain = drain.clone();
        let (inflow, outflow) = (tank.inflow, tank.outflow);
        move |rates: &mut Rates<'_>| {
            let out = if drain.get() { outflow } else { 0.0 };
            rates.set_rate(level, inflow - out);
        }
    })?;
    sim.start(continuous)?;

    let state: Shared = Rc::new(RefCell::new(Controller {
        drain,
        last_opened: None,
        cycles: Count::new("cycles", 0.0),
        cycle_time: Tally::new("cycle time", 0.0),
        draining: Accumulate::new("draining", 0.0, 0.0)?,
    }));
    let id = sim.spawn("controller", {
        let state = state.clone();
        let tank = tank.clone();
        move |cx| controller(cx, state, level, tank)
    });
    sim.activate(id)?;

    let stats = sim.run_until(config.horizon)?;
    let state = state.borrow();
    Ok(TankReport {
        end_time: sim.time(),
        final_level: sim.state(level)?,
        cycles: state.cycles.clone(),
        cycle_time: state.cycle_time.clone(),
        draining: state.draining.clone(),
        stats,
    })
}
