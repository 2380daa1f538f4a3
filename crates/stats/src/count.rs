//! Occurrence counter.

use crate::format::title_reset_obs;
use crate::Collector;
use disco_types::SimTime;

/// Counts occurrences of an event, such as customers turned away.
#[derive(Debug, Clone)]
pub struct Count {
    title: String,
    reset_at: SimTime,
    count: u64,
}

impl Count {
    pub fn new(title: &str, now: SimTime) -> Self {
        Self {
            title: crate::format::title(title),
            reset_at: now,
            count: 0,
        }
    }

    /// Add `n` occurrences.
    pub fn update(&mut self, n: u64) {
        self.count += n;
    }

    /// Add one occurrence.
    pub fn increment(&mut self) {
        self.update(1);
    }
}

impl Collector for Count {
    fn title(&self) -> &str {
        &self.title
    }

    fn observations(&self) -> u64 {
        self.count
    }

    fn reset_at(&self) -> SimTime {
        self.reset_at
    }

    fn reset(&mut self, now: SimTime) {
        self.reset_at = now;
        self.count = 0;
    }

    fn report_lines(&self, _now: SimTime) -> Vec<String> {
        vec![title_reset_obs(&self.title, self.reset_at, self.count)]
    }
}
