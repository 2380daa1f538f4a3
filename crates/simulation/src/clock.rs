//! Simulated clock.

use crate::ProgrammerError;
use disco_types::SimTime;

/// Monotonic simulated time. Only the dispatcher moves it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Clock {
    now: SimTime,
}

impl Clock {
    pub(crate) fn now(&self) -> SimTime {
        self.now
    }

    /// Move to `to`. Equal time is allowed; earlier time is not.
    pub(crate) fn advance_to(&mut self, to: SimTime) -> Result<(), ProgrammerError> {
        if to < self.now {
            return Err(ProgrammerError::ClockRewind {
                from: self.now,
                to,
            });
        }
        self.now = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = Clock::default();
        assert_eq!(clock.now(), 0.0);
        clock.advance_to(2.5).unwrap();
        clock.advance_to(2.5).unwrap();
        assert_eq!(clock.now(), 2.5);
        assert_eq!(
            clock.advance_to(1.0),
            Err(ProgrammerError::ClockRewind { from: 2.5, to: 1.0 })
        );
        assert_eq!(clock.now(), 2.5);
    }
}
