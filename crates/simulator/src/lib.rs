//! Example models and command-line driver for the simulation kernel.
//!
//! # Models
//!
//! - **Bank**: an M/M/c queue. Customers are processes waiting in a
//!   [`disco_queue::Ring`]; tellers take them in arrival order. Reports the
//!   waiting time, line length and teller utilization.
//! - **Tank**: a combined model. The level evolves continuously and a
//!   controller reacts to the high and low marks through `wait_until`.
//!
//! # Example
//!
//! ```ignore
//! use disco_simulator::{run_bank, BankConfig, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(10_000.0).with_seed(42);
//! let report = run_bank(&config, &BankConfig::default().with_tellers(3))?;
//!
//! println!("mean wait: {:.3}", report.wait.mean());
//! report.log();
//! ```

pub mod config;
pub mod models;

pub use config::{BankConfig, SimulatorConfig, TankConfig};
pub use models::{run_bank, run_tank, BankReport, TankReport};
