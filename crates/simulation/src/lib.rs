//! Process-oriented combined simulation kernel.
//!
//! Independent processes evolve in simulated time, suspending and
//! rescheduling themselves, while continuous variables evolve by numerical
//! integration between discrete events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Event list (disco_queue::Ring, one sentinel)     │ │
//! │  │   Ordered by: time, then scheduling order (FIFO)   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ earliest entry              │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Continuous system: integrate all active          │ │
//! │  │   variables up to the entry's time (RK4)           │ │
//! │  │   and wake wait_until() processes on the way       │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Resume the process body (poll its future) until  │ │
//! │  │   hold / passivate / wait_until / completion       │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All state of one simulation (clock, event list, processes, variables)
//! lives behind one [`SimHandle`], so independent simulations can coexist.
//! Process bodies are `async` blocks polled by the dispatcher one at a time;
//! the only suspension points are the primitives on [`ProcessContext`].
//!
//! # Example
//!
//! ```ignore
//! let mut sim = SimulationRunner::new(SimulationConfig::default())?;
//! let tank = sim.new_continuous("tank", |_| {});
//! let level = sim.new_variable(tank, 0.0)?;
//! sim.set_derivatives(tank, move |r| r.set_rate(level, 2.0))?;
//!
//! let watcher = sim.spawn("watcher", move |cx| async move {
//!     cx.wait_until(move |v| v.state(level) >= 10.0).await?;
//!     println!("full at {}", cx.now());
//!     Ok(())
//! });
//! sim.start(tank)?;
//! sim.activate(watcher)?;
//! sim.run_until(100.0)?;
//! ```

mod clock;
mod config;
mod continuous;
mod error;
mod event_list;
mod kernel;
mod process;
mod runner;

pub use config::{IntegrationMethod, IntegratorConfig, SimulationConfig};
pub use continuous::{ContinuousId, Derivatives, Rates, StateView, VariableId};
pub use error::{ProgrammerError, SimError};
pub use kernel::SimHandle;
pub use process::{ProcessContext, ProcessId, ProcessState};
pub use runner::{SimulationRunner, SimulationStats};

pub use disco_types::SimTime;
