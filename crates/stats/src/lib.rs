//! Observation collectors for simulation models.
//!
//! Model code pushes values into collectors as the simulation runs; the
//! collectors keep summary statistics and render fixed-width report lines.
//!
//! | Collector      | Observes                                        |
//! |----------------|-------------------------------------------------|
//! | [`Tally`]      | independent samples (waiting times, ...)        |
//! | [`Accumulate`] | a piecewise-constant signal over time (lengths) |
//! | [`Histogram`]  | samples, binned into equal-width cells          |
//! | [`Count`]      | occurrences                                     |
//!
//! Reports are logged at `info` level with target `disco::statistics`, so
//! they can be routed or silenced independently of the kernel's own logs.

mod accumulate;
mod count;
mod format;
mod histogram;
mod tally;

pub use accumulate::Accumulate;
pub use count::Count;
pub use format::{number, HEADING, TITLE_WIDTH};
pub use histogram::Histogram;
pub use tally::Tally;

pub use disco_types::{InputError, SimTime};

use tracing::info;

/// Log target of every report.
pub const REPORT_TARGET: &str = "disco::statistics";

/// Behaviour shared by all collectors.
///
/// Values are pushed with each collector's own `update`, whose signature
/// depends on what it observes.
pub trait Collector {
    /// Title, at most [`TITLE_WIDTH`] characters.
    fn title(&self) -> &str;

    /// Number of updates since the last reset.
    fn observations(&self) -> u64;

    /// Time of creation or of the last reset.
    fn reset_at(&self) -> SimTime;

    /// Discard everything observed so far.
    fn reset(&mut self, now: SimTime);

    /// Render the report, one string per line.
    fn report_lines(&self, now: SimTime) -> Vec<String>;

    /// Log the report.
    fn report(&self, now: SimTime) {
        for line in self.report_lines(now) {
            info!(target: REPORT_TARGET, "{}", line);
        }
    }
}

/// Log the column heading followed by the report of every collector.
pub fn report_all(collectors: &[&dyn Collector], now: SimTime) {
    info!(target: REPORT_TARGET, "{}", HEADING);
    for collector in collectors {
        collector.report(now);
    }
}
