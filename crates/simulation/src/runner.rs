//! Dispatch loop.
//!
//! Each step takes the earliest entry off the event list, brings the clock
//! and every active continuous variable up to its time, and resumes that
//! process's body until it suspends again or finishes.

use crate::event_list::Notice;
use crate::{ProcessState, ProgrammerError, SimError, SimHandle, SimulationConfig};
use disco_types::{check_finite, SimTime};
use std::ops::Deref;
use std::task::{Context, Poll};
use tracing::{debug, info, trace, warn};

/// Statistics collected during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Process resumptions performed by the dispatcher.
    pub events_dispatched: u64,
    /// Accepted integration sub-steps.
    pub integration_steps: u64,
    /// Sub-steps discarded while locating a state event.
    pub rejected_steps: u64,
    /// Processes woken by a `wait_until` condition.
    pub state_events: u64,
    /// Process bodies that ran to completion.
    pub processes_terminated: u64,
    /// Whether the last run stopped at the `max_events` limit.
    pub hit_event_limit: bool,
}

/// Owns a simulation and drives its dispatch loop.
///
/// Dereferences to [`SimHandle`] for spawning and activating processes and
/// for creating continuous variables before (or between) runs.
///
/// ```ignore
/// let mut sim = SimulationRunner::new(SimulationConfig::default())?;
/// let p = sim.spawn("main", |cx| async move {
///     cx.hold(10.0).await?;
///     Ok(())
/// });
/// sim.activate(p)?;
/// let stats = sim.run()?;
/// assert_eq!(sim.time(), 10.0);
/// ```
pub struct SimulationRunner {
    handle: SimHandle,
}

/// What one dispatch attempt did.
enum Step {
    Dispatched,
    Idle,
}

impl SimulationRunner {
    /// Create a simulation with the given configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            handle: SimHandle::new(config),
        })
    }

    /// A handle that can be moved into model code.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    /// Run until the event list is empty.
    ///
    /// Returns the first error raised by a process body or by the kernel;
    /// the run stops there.
    pub fn run(&mut self) -> Result<SimulationStats, SimError> {
        self.run_inner(None)
    }

    /// Dispatch every entry scheduled at or before `end`, then bring the
    /// clock and continuous state up to `end`.
    pub fn run_until(&mut self, end: SimTime) -> Result<SimulationStats, SimError> {
        check_finite("end", end)?;
        self.run_inner(Some(end))
    }

    /// Dispatch a single process. Returns `false` if the event list is empty.
    pub fn step(&mut self) -> Result<bool, SimError> {
        Ok(matches!(self.step_until(None)?, Step::Dispatched))
    }

    fn run_inner(&mut self, end: Option<SimTime>) -> Result<SimulationStats, SimError> {
        let (start, max_events, dispatched_before) = {
            let mut kernel = self.handle.kernel.borrow_mut();
            kernel.stats.hit_event_limit = false;
            (
                kernel.clock.now(),
                kernel.config.max_events,
                kernel.stats.events_dispatched,
            )
        };
        info!(start, ?end, pending = self.handle.pending_events(), "Simulation run starting");

        loop {
            if let Some(limit) = max_events {
                let dispatched = self.handle.kernel.borrow().stats.events_dispatched;
                if dispatched - dispatched_before >= limit {
                    warn!(limit, "Event limit reached, stopping run");
                    self.handle.kernel.borrow_mut().stats.hit_event_limit = true;
                    break;
                }
            }
            if let Step::Idle = self.step_until(end)? {
                break;
            }
        }

        let stats = self.handle.stats();
        info!(
            now = self.handle.time(),
            events = stats.events_dispatched,
            integration_steps = stats.integration_steps,
            state_events = stats.state_events,
            "Simulation run finished"
        );
        Ok(stats)
    }

    fn step_until(&mut self, end: Option<SimTime>) -> Result<Step, SimError> {
        loop {
            let (next, now) = {
                let kernel = self.handle.kernel.borrow();
                (kernel.events.first(), kernel.clock.now())
            };

            match (next, end) {
                (Some(notice), end) if end.map_or(true, |end| notice.time <= end) => {
                    if !self.handle.kernel.borrow_mut().advance_to(notice.time)? {
                        // A state event fired on the way; its waiters now
                        // come first.
                        continue;
                    }
                    let Some(notice) = self.handle.kernel.borrow_mut().events.pop()? else {
                        return Ok(Step::Idle);
                    };
                    self.resume(notice)?;
                    return Ok(Step::Dispatched);
                }
                (_, Some(end)) if end > now => {
                    if !self.handle.kernel.borrow_mut().advance_to(end)? {
                        continue;
                    }
                    return Ok(Step::Idle);
                }
                _ => return Ok(Step::Idle),
            }
        }
    }

    fn resume(&mut self, notice: Notice) -> Result<(), SimError> {
        let process = notice.process;
        let mut body = {
            let mut kernel = self.handle.kernel.borrow_mut();
            kernel.clock.advance_to(notice.time)?;
            kernel.current = Some(process);
            kernel.stats.events_dispatched += 1;
            let record = kernel.record_mut(process)?;
            record.state = ProcessState::Active;
            record
                .body
                .take()
                .ok_or(ProgrammerError::Terminated { process })?
        };
        trace!(%process, time = notice.time, "Resuming");

        // Bodies only ever wait on the kernel, which resumes them by polling
        // again; nothing needs to be woken.
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let poll = body.as_mut().poll(&mut cx);

        let mut kernel = self.handle.kernel.borrow_mut();
        kernel.current = None;
        match poll {
            Poll::Ready(result) => {
                kernel.terminate(process)?;
                if let Err(error) = result {
                    warn!(%process, %error, "Process body failed, stopping run");
                    return Err(error);
                }
            }
            Poll::Pending => {
                if kernel.record(process)?.state == ProcessState::Active {
                    kernel.terminate(process)?;
                    return Err(ProgrammerError::ForeignSuspension { process }.into());
                }
                let record = kernel.record_mut(process)?;
                record.body = Some(body);
                let state = record.state;
                debug!(%process, %state, "Suspended");
            }
        }

        let now = kernel.clock.now();
        kernel.fire_waiters(now)
    }
}

impl Drop for SimulationRunner {
    /// Bodies, conditions and derivative functions may hold handles to the
    /// kernel that owns them; drop them so the kernel can be freed.
    fn drop(&mut self) {
        if let Ok(mut kernel) = self.handle.kernel.try_borrow_mut() {
            let released = kernel.release_model_code();
            drop(kernel);
            drop(released);
        }
    }
}

impl Deref for SimulationRunner {
    type Target = SimHandle;

    fn deref(&self) -> &SimHandle {
        &self.handle
    }
}
