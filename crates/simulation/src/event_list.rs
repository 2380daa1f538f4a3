//! Time-ordered event list.
//!
//! One [`Ring`] head holding an event notice for every scheduled process,
//! sorted ascending by time. Entries with equal time keep the order in which
//! they were scheduled, unless inserted with `prior`, which places them
//! ahead of their equal-time peers.

use crate::ProcessId;
use disco_queue::{HeadId, LinkId, QueueError, Ring};
use disco_types::SimTime;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Notice {
    pub(crate) process: ProcessId,
    pub(crate) time: SimTime,
}

#[derive(Debug)]
pub(crate) struct EventList {
    ring: Ring<Notice>,
    head: HeadId,
}

impl Default for EventList {
    fn default() -> Self {
        let mut ring = Ring::new();
        let head = ring.new_head();
        Self { ring, head }
    }
}

impl EventList {
    /// Create the notice a process will use for its whole life. Detached.
    pub(crate) fn register(&mut self, process: ProcessId) -> LinkId {
        self.ring.insert(Notice { process, time: 0.0 })
    }

    /// Destroy a notice once its process has terminated.
    pub(crate) fn release(&mut self, notice: LinkId) -> Result<(), QueueError> {
        self.ring.release(notice).map(|_| ())
    }

    /// Insert (or move) `notice` at `time`.
    ///
    /// Scans from the back, since new events tend to lie in the future of
    /// everything already scheduled.
    pub(crate) fn schedule(
        &mut self,
        notice: LinkId,
        time: SimTime,
        prior: bool,
    ) -> Result<(), QueueError> {
        self.ring.out(notice)?;
        if let Some(slot) = self.ring.get_mut(notice) {
            slot.time = time;
        }

        let mut cursor = self.ring.last(self.head);
        while let Some(link) = cursor {
            let at = self.ring.get(link).map(|n| n.time).unwrap_or(SimTime::MIN);
            let goes_after = if prior { at < time } else { at <= time };
            if goes_after {
                return self.ring.follow(notice, link);
            }
            cursor = self.ring.pred(link);
        }
        self.ring.follow(notice, self.head)
    }

    /// Remove `notice` from the list. No-op if not scheduled.
    pub(crate) fn cancel(&mut self, notice: LinkId) -> Result<(), QueueError> {
        self.ring.out(notice)
    }

    /// Earliest entry without removing it.
    pub(crate) fn first(&self) -> Option<Notice> {
        self.ring
            .first(self.head)
            .and_then(|link| self.ring.get(link))
            .copied()
    }

    /// Remove and return the earliest entry.
    pub(crate) fn pop(&mut self) -> Result<Option<Notice>, QueueError> {
        let Some(link) = self.ring.first(self.head) else {
            return Ok(None);
        };
        self.ring.out(link)?;
        Ok(self.ring.get(link).copied())
    }

    /// Scheduled time of `notice`, if it is in the list.
    pub(crate) fn time_of(&self, notice: LinkId) -> Option<SimTime> {
        if !self.ring.is_linked(notice) {
            return None;
        }
        self.ring.get(notice).map(|n| n.time)
    }

    pub(crate) fn len(&self) -> usize {
        self.ring.cardinal(self.head)
    }

    /// Entries in dispatch order.
    #[cfg(test)]
    pub(crate) fn entries(&self) -> impl Iterator<Item = Notice> + '_ {
        self.ring.iter(self.head).map(|(_, notice)| *notice)
    }
}
