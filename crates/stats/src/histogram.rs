//! Samples binned into equal-width cells.

use crate::format::number;
use crate::{Collector, Tally};
use disco_types::{check_finite, InputError, SimTime};

/// Widest bar drawn in a report.
const BAR_WIDTH: u64 = 40;

/// Frequency table over `[lower, upper)` with an underflow and an overflow
/// cell, plus the [`Tally`] statistics of the same samples.
#[derive(Debug, Clone)]
pub struct Histogram {
    tally: Tally,
    lower: f64,
    upper: f64,
    /// `cells[0]` counts samples below `lower`, the last cell those at or
    /// above `upper`.
    cells: Vec<u64>,
}

impl Histogram {
    /// Create a histogram with `cells` equal-width cells between `lower`
    /// and `upper`.
    pub fn new(
        title: &str,
        now: SimTime,
        lower: f64,
        upper: f64,
        cells: usize,
    ) -> Result<Self, InputError> {
        check_finite("lower", lower)?;
        check_finite("upper", upper)?;
        if lower >= upper {
            return Err(InputError::InvalidRange {
                lo: lower,
                hi: upper,
            });
        }
        if cells == 0 {
            return Err(InputError::NonPositive {
                name: "cells",
                value: 0.0,
            });
        }
        Ok(Self {
            tally: Tally::new(title, now),
            lower,
            upper,
            cells: vec![0; cells + 2],
        })
    }

    fn width(&self) -> f64 {
        (self.upper - self.lower) / (self.cells.len() - 2) as f64
    }

    fn cell_of(&self, value: f64) -> usize {
        if value < self.lower {
            return 0;
        }
        if value >= self.upper {
            return self.cells.len() - 1;
        }
        let inner = ((value - self.lower) / self.width()) as usize;
        1 + inner.min(self.cells.len() - 3)
    }

    /// Record a sample.
    pub fn update(&mut self, value: f64) -> Result<(), InputError> {
        self.tally.update(value)?;
        let cell = self.cell_of(value);
        self.cells[cell] += 1;
        Ok(())
    }

    /// Counts per cell: underflow, the equal-width cells, overflow.
    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Statistics of all recorded samples.
    pub fn tally(&self) -> &Tally {
        &self.tally
    }
}

impl Collector for Histogram {
    fn title(&self) -> &str {
        self.tally.title()
    }

    fn observations(&self) -> u64 {
        self.tally.observations()
    }

    fn reset_at(&self) -> SimTime {
        self.tally.reset_at()
    }

    fn reset(&mut self, now: SimTime) {
        self.tally.reset(now);
        self.cells.iter_mut().for_each(|count| *count = 0);
    }

    fn report_lines(&self, _now: SimTime) -> Vec<String> {
        let mut lines = vec![self.tally.summary_line()];
        let total = self.tally.observations();
        if total == 0 {
            return lines;
        }
        let peak = self.cells.iter().copied().max().unwrap_or(0).max(1);

        lines.push("      cell/lower lim/      n/    freq/".to_string());
        for (index, &count) in self.cells.iter().enumerate() {
            let lower = match index {
                0 => "  -infinity".to_string(),
                _ => format!(" {}", number(self.lower + (index - 1) as f64 * self.width())),
            };
            let freq = count as f64 / total as f64;
            let bar = "*".repeat((count * BAR_WIDTH / peak) as usize);
            lines.push(format!(
                "{:>10}{}{:>8}{} {}",
                index,
                lower,
                count,
                number(freq),
                bar
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning() {
        let mut histogram = Histogram::new("service", 0.0, 0.0, 10.0, 5).unwrap();
        for value in [-1.0, 0.0, 1.9, 2.0, 5.5, 9.99, 10.0, 42.0] {
            histogram.update(value).unwrap();
        }
        assert_eq!(histogram.cells(), &[1, 2, 1, 1, 0, 1, 2]);
        assert_eq!(histogram.observations(), 8);
        assert_eq!(histogram.tally().max(), Some(42.0));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert_eq!(
            Histogram::new("h", 0.0, 5.0, 5.0, 3).err(),
            Some(InputError::InvalidRange { lo: 5.0, hi: 5.0 })
        );
        assert!(matches!(
            Histogram::new("h", 0.0, 0.0, 1.0, 0),
            Err(InputError::NonPositive { name: "cells", .. })
        ));
    }

    #[test]
    fn test_report_has_row_per_cell() {
        let mut histogram = Histogram::new("h", 0.0, 0.0, 1.0, 4).unwrap();
        for value in [0.1, 0.3, 0.35, 0.9] {
            histogram.update(value).unwrap();
        }
        let lines = histogram.report_lines(1.0);
        // summary + column heading + 6 cells
        assert_eq!(lines.len(), 8);
        assert!(lines[4].ends_with(&"*".repeat(40)));
    }

    #[test]
    fn test_reset_clears_cells() {
        let mut histogram = Histogram::new("h", 0.0, 0.0, 1.0, 2).unwrap();
        histogram.update(0.5).unwrap();
        histogram.reset(3.0);
        assert!(histogram.cells().iter().all(|c| *c == 0));
        assert_eq!(histogram.reset_at(), 3.0);
        assert_eq!(histogram.report_lines(3.0).len(), 1);
    }
}
