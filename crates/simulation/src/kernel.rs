//! Shared kernel state and the handle model code uses to reach it.

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::continuous::{Advance, ContinuousSystem, Derivatives, Rates, StateView, StepCount};
use crate::event_list::EventList;
use crate::process::{Body, Condition};
use crate::{
    ContinuousId, ProcessContext, ProcessId, ProcessState, ProgrammerError, SimError,
    SimulationStats, VariableId,
};
use disco_queue::LinkId;
use disco_types::{check_finite, SimTime};
use futures::FutureExt;
use std::cell::{Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, trace, warn};

pub(crate) struct ProcessRecord {
    pub(crate) name: String,
    pub(crate) state: ProcessState,
    pub(crate) notice: LinkId,
    pub(crate) body: Option<Body>,
}

struct Waiter {
    process: ProcessId,
    condition: Condition,
}

/// When an activation takes effect.
#[derive(Debug, Clone, Copy)]
enum Activation {
    /// Now, after every entry already scheduled for now.
    Now,
    /// Now, before every entry already scheduled for now.
    Prior,
    /// At an absolute time.
    At(SimTime),
    /// After a delay.
    In(f64),
}

/// Everything one simulation owns: clock, event list, processes and the
/// continuous system.
pub(crate) struct Kernel {
    pub(crate) config: SimulationConfig,
    pub(crate) clock: Clock,
    pub(crate) events: EventList,
    pub(crate) processes: Vec<ProcessRecord>,
    pub(crate) current: Option<ProcessId>,
    system: ContinuousSystem,
    waiters: Vec<Waiter>,
    pub(crate) stats: SimulationStats,
}

impl Kernel {
    pub(crate) fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            clock: Clock::default(),
            events: EventList::default(),
            processes: Vec::new(),
            current: None,
            system: ContinuousSystem::default(),
            waiters: Vec::new(),
            stats: SimulationStats::default(),
        }
    }

    pub(crate) fn record(&self, process: ProcessId) -> Result<&ProcessRecord, ProgrammerError> {
        self.processes
            .get(process.index())
            .ok_or(ProgrammerError::UnknownProcess { process })
    }

    pub(crate) fn record_mut(
        &mut self,
        process: ProcessId,
    ) -> Result<&mut ProcessRecord, ProgrammerError> {
        self.processes
            .get_mut(process.index())
            .ok_or(ProgrammerError::UnknownProcess { process })
    }

    fn schedule(&mut self, process: ProcessId, time: SimTime, prior: bool) -> Result<(), SimError> {
        let notice = self.record(process)?.notice;
        self.events.schedule(notice, time, prior)?;
        self.record_mut(process)?.state = ProcessState::Scheduled;
        Ok(())
    }

    /// Reject non-finite times; clamp past times to now.
    fn resolve_time(&self, time: SimTime) -> Result<SimTime, ProgrammerError> {
        check_finite("time", time).map_err(|_| ProgrammerError::InvalidTime { time })?;
        let now = self.clock.now();
        if time < now {
            warn!(time, now, "Activation time in the past, using current time");
            return Ok(now);
        }
        Ok(time)
    }

    /// Suspension primitives may only be used by the process holding control.
    fn ensure_current(&self, process: ProcessId) -> Result<(), ProgrammerError> {
        if self.record(process)?.state == ProcessState::Terminated {
            return Err(ProgrammerError::Terminated { process });
        }
        if self.current != Some(process) {
            return Err(ProgrammerError::NotCurrent { process });
        }
        Ok(())
    }

    fn abandon_wait(&mut self, process: ProcessId) {
        self.waiters.retain(|w| w.process != process);
    }

    fn activate(
        &mut self,
        process: ProcessId,
        when: Activation,
        reactivate: bool,
    ) -> Result<(), SimError> {
        match self.record(process)?.state {
            ProcessState::Terminated => return Err(ProgrammerError::Terminated { process }.into()),
            ProcessState::NotStarted | ProcessState::Passive => {}
            ProcessState::Scheduled if reactivate => {}
            state => return Err(ProgrammerError::DoubleActivation { process, state }.into()),
        }

        let now = self.clock.now();
        let (time, prior) = match when {
            Activation::Now => (now, false),
            Activation::Prior => (now, true),
            Activation::At(time) => (self.resolve_time(time)?, false),
            Activation::In(delay) => {
                check_finite("delay", delay)
                    .map_err(|_| ProgrammerError::InvalidTime { time: delay })?;
                (self.resolve_time(now + delay)?, false)
            }
        };

        self.abandon_wait(process);
        self.schedule(process, time, prior)?;
        debug!(%process, time, prior, reactivate, "Activated");
        Ok(())
    }

    fn hold(&mut self, process: ProcessId, duration: f64) -> Result<(), SimError> {
        self.ensure_current(process)?;
        if !duration.is_finite() {
            return Err(ProgrammerError::InvalidTime { time: duration }.into());
        }
        if duration < 0.0 {
            return Err(ProgrammerError::NegativeHold { duration }.into());
        }
        let until = self.clock.now() + duration;
        self.schedule(process, until, false)?;
        trace!(%process, until, "Hold");
        Ok(())
    }

    fn passivate(&mut self, process: ProcessId) -> Result<(), SimError> {
        self.ensure_current(process)?;
        self.record_mut(process)?.state = ProcessState::Passive;
        debug!(%process, "Passivated");
        Ok(())
    }

    /// Returns whether the caller has to suspend.
    fn wait_until(&mut self, process: ProcessId, condition: Condition) -> Result<bool, SimError> {
        self.ensure_current(process)?;
        let view = StateView::new(self.clock.now(), self.system.states());
        if condition(&view) {
            return Ok(false);
        }
        self.waiters.push(Waiter { process, condition });
        self.record_mut(process)?.state = ProcessState::Passive;
        debug!(%process, "Waiting for condition");
        Ok(true)
    }

    fn cancel(&mut self, process: ProcessId) -> Result<(), SimError> {
        let record = self.record(process)?;
        match record.state {
            ProcessState::Scheduled => {}
            ProcessState::Terminated => return Err(ProgrammerError::Terminated { process }.into()),
            state => return Err(ProgrammerError::NotScheduled { process, state }.into()),
        }
        let notice = record.notice;
        self.events.cancel(notice)?;
        self.record_mut(process)?.state = ProcessState::Passive;
        debug!(%process, "Cancelled");
        Ok(())
    }

    /// Schedule every waiter whose condition holds at `time`, in wait order.
    pub(crate) fn fire_waiters(&mut self, time: SimTime) -> Result<(), SimError> {
        if self.waiters.is_empty() {
            return Ok(());
        }
        let waiters = std::mem::take(&mut self.waiters);
        let view = StateView::new(time, self.system.states());
        let (ready, pending): (Vec<_>, Vec<_>) =
            waiters.into_iter().partition(|w| (w.condition)(&view));
        self.waiters = pending;

        for waiter in ready {
            self.schedule(waiter.process, time, false)?;
            self.stats.state_events += 1;
            debug!(process = %waiter.process, time, "State event");
        }
        Ok(())
    }

    /// Move the clock (and all active variables) to `target`.
    ///
    /// Returns `false` if a state condition fired first; the clock then
    /// stands at the crossing and the waiters are scheduled there.
    pub(crate) fn advance_to(&mut self, target: SimTime) -> Result<bool, SimError> {
        let from = self.clock.now();
        let Self {
            config,
            system,
            waiters,
            stats,
            ..
        } = self;

        let mut steps = StepCount::default();
        let outcome = system.advance(from, target, &config.integrator, &mut steps, |view| {
            waiters.iter().any(|w| (w.condition)(view))
        })?;
        stats.integration_steps += steps.accepted;
        stats.rejected_steps += steps.rejected;

        match outcome {
            Advance::Reached => {
                self.clock.advance_to(target)?;
                Ok(true)
            }
            Advance::Triggered(at) => {
                self.clock.advance_to(at)?;
                self.fire_waiters(at)?;
                Ok(false)
            }
        }
    }

    /// Take out every closure model code handed in. They may hold handles
    /// to this kernel.
    pub(crate) fn release_model_code(&mut self) -> (Vec<Body>, Vec<Condition>, Vec<Derivatives>) {
        let bodies = self
            .processes
            .iter_mut()
            .filter_map(|record| record.body.take())
            .collect();
        let conditions = std::mem::take(&mut self.waiters)
            .into_iter()
            .map(|waiter| waiter.condition)
            .collect();
        (bodies, conditions, self.system.take_derivatives())
    }

    pub(crate) fn terminate(&mut self, process: ProcessId) -> Result<(), SimError> {
        let record = self.record_mut(process)?;
        record.state = ProcessState::Terminated;
        record.body = None;
        let notice = record.notice;
        self.events.release(notice)?;
        self.abandon_wait(process);
        self.stats.processes_terminated += 1;
        debug!(%process, time = self.clock.now(), "Terminated");
        Ok(())
    }
}

/// Cheap, clonable handle to a simulation.
///
/// Offers every operation that does not suspend the caller. The host gets
/// one from [`SimulationRunner`](crate::SimulationRunner); process bodies
/// reach it through their [`ProcessContext`].
///
/// Derivative functions and `wait_until` conditions run while the kernel is
/// busy and must use the view they are given instead of this handle. Called
/// from there, the fallible operations return
/// [`ProgrammerError::KernelBusy`]; the infallible ones (`time`, `spawn`,
/// `current`, `pending_events`, `new_continuous`, `stats`) panic.
#[derive(Clone)]
pub struct SimHandle {
    pub(crate) kernel: Rc<RefCell<Kernel>>,
}

impl SimHandle {
    pub(crate) fn new(config: SimulationConfig) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(Kernel::new(config))),
        }
    }

    fn kernel(&self) -> Result<Ref<'_, Kernel>, ProgrammerError> {
        self.kernel
            .try_borrow()
            .map_err(|_| ProgrammerError::KernelBusy)
    }

    fn kernel_mut(&self) -> Result<RefMut<'_, Kernel>, ProgrammerError> {
        self.kernel
            .try_borrow_mut()
            .map_err(|_| ProgrammerError::KernelBusy)
    }

    /// Current simulated time.
    pub fn time(&self) -> SimTime {
        self.kernel.borrow().clock.now()
    }

    /// Create a process. It stays [`ProcessState::NotStarted`] until activated.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let p = sim.spawn("clerk", |cx| async move {
    ///     cx.hold(5.0).await?;
    ///     Ok(())
    /// });
    /// sim.activate(p)?;
    /// ```
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, body: F) -> ProcessId
    where
        F: FnOnce(ProcessContext) -> Fut,
        Fut: Future<Output = Result<(), SimError>> + 'static,
    {
        let name = name.into();
        let id = {
            let mut kernel = self.kernel.borrow_mut();
            let id = ProcessId::new(kernel.processes.len());
            let notice = kernel.events.register(id);
            debug!(process = %id, %name, "Spawned");
            kernel.processes.push(ProcessRecord {
                name,
                state: ProcessState::NotStarted,
                notice,
                body: None,
            });
            id
        };

        // The body is built outside the borrow: it may spawn in turn.
        let future = body(ProcessContext::new(self.clone(), id)).boxed_local();
        if let Some(record) = self.kernel.borrow_mut().processes.get_mut(id.index()) {
            record.body = Some(future);
        }
        id
    }

    /// Schedule a not-started or passive process for now, after every
    /// process already scheduled for now.
    pub fn activate(&self, process: ProcessId) -> Result<(), SimError> {
        self.kernel_mut()?
            .activate(process, Activation::Now, false)
    }

    /// Schedule a not-started or passive process for now, ahead of every
    /// process already scheduled for now.
    pub fn activate_prior(&self, process: ProcessId) -> Result<(), SimError> {
        self.kernel_mut()?
            .activate(process, Activation::Prior, false)
    }

    /// Schedule a not-started or passive process at `time`.
    /// A time in the past means now.
    pub fn activate_at(&self, process: ProcessId, time: SimTime) -> Result<(), SimError> {
        self.kernel_mut()?
            .activate(process, Activation::At(time), false)
    }

    /// Schedule a not-started or passive process `delay` from now.
    pub fn activate_in(&self, process: ProcessId, delay: f64) -> Result<(), SimError> {
        self.kernel_mut()?
            .activate(process, Activation::In(delay), false)
    }

    /// Like [`activate_at`](Self::activate_at), but a scheduled process is
    /// moved to the new time instead of being rejected.
    pub fn reactivate_at(&self, process: ProcessId, time: SimTime) -> Result<(), SimError> {
        self.kernel_mut()?
            .activate(process, Activation::At(time), true)
    }

    /// Remove the pending event of a scheduled process, leaving it passive.
    pub fn cancel(&self, process: ProcessId) -> Result<(), SimError> {
        self.kernel_mut()?.cancel(process)
    }

    pub(crate) fn hold(&self, process: ProcessId, duration: f64) -> Result<(), SimError> {
        self.kernel_mut()?.hold(process, duration)
    }

    pub(crate) fn passivate(&self, process: ProcessId) -> Result<(), SimError> {
        self.kernel_mut()?.passivate(process)
    }

    pub(crate) fn wait_until(
        &self,
        process: ProcessId,
        condition: Condition,
    ) -> Result<bool, SimError> {
        self.kernel_mut()?.wait_until(process, condition)
    }

    /// Lifecycle state of a process.
    pub fn process_state(&self, process: ProcessId) -> Result<ProcessState, SimError> {
        Ok(self.kernel()?.record(process)?.state)
    }

    /// Name given at spawn.
    pub fn process_name(&self, process: ProcessId) -> Result<String, SimError> {
        Ok(self.kernel()?.record(process)?.name.clone())
    }

    /// Time of the pending event of a scheduled process.
    pub fn scheduled_time(&self, process: ProcessId) -> Option<SimTime> {
        let kernel = self.kernel().ok()?;
        let record = kernel.record(process).ok()?;
        if record.state != ProcessState::Scheduled {
            return None;
        }
        kernel.events.time_of(record.notice)
    }

    /// Whether the process has no pending event (and is not running).
    pub fn is_idle(&self, process: ProcessId) -> bool {
        !matches!(
            self.process_state(process),
            Ok(ProcessState::Scheduled | ProcessState::Active)
        )
    }

    /// Whether the body of the process has finished.
    pub fn is_terminated(&self, process: ProcessId) -> bool {
        matches!(self.process_state(process), Ok(ProcessState::Terminated))
    }

    /// The process whose body is running, if any.
    pub fn current(&self) -> Option<ProcessId> {
        self.kernel.borrow().current
    }

    /// Number of entries in the event list.
    pub fn pending_events(&self) -> usize {
        self.kernel.borrow().events.len()
    }

    /// Create an inactive continuous with the given derivative function.
    pub fn new_continuous<F>(&self, name: impl Into<String>, derivatives: F) -> ContinuousId
    where
        F: FnMut(&mut Rates<'_>) + 'static,
    {
        let name = name.into();
        let id = self
            .kernel
            .borrow_mut()
            .system
            .add_continuous(name.clone(), Box::new(derivatives));
        debug!(continuous = %id, %name, "Created continuous");
        id
    }

    /// Replace the derivative function of a continuous.
    ///
    /// Derivatives usually need the ids of the variables they drive, which
    /// only exist once the continuous does:
    ///
    /// ```ignore
    /// let tank = sim.new_continuous("tank", |_| {});
    /// let level = sim.new_variable(tank, 0.0)?;
    /// sim.set_derivatives(tank, move |r| r.set_rate(level, 2.0))?;
    /// ```
    pub fn set_derivatives<F>(&self, continuous: ContinuousId, derivatives: F) -> Result<(), SimError>
    where
        F: FnMut(&mut Rates<'_>) + 'static,
    {
        self.kernel_mut()?
            .system
            .set_derivatives(continuous, Box::new(derivatives))?;
        Ok(())
    }

    /// Create a variable owned by `owner`, with rate 0.
    pub fn new_variable(&self, owner: ContinuousId, initial: f64) -> Result<VariableId, SimError> {
        check_finite("initial state", initial)?;
        Ok(self.kernel_mut()?.system.add_variable(owner, initial)?)
    }

    /// Admit a continuous into integration from its current states.
    pub fn start(&self, continuous: ContinuousId) -> Result<(), SimError> {
        let mut kernel = self.kernel_mut()?;
        let now = kernel.clock.now();
        kernel.system.set_active(continuous, true)?;
        kernel.system.refresh_rates(now)?;
        let name = kernel.system.name(continuous)?;
        debug!(%continuous, name, now, "Started");
        Ok(())
    }

    /// Exclude a continuous from integration, freezing its variables.
    pub fn stop(&self, continuous: ContinuousId) -> Result<(), SimError> {
        let mut kernel = self.kernel_mut()?;
        kernel.system.set_active(continuous, false)?;
        let name = kernel.system.name(continuous)?;
        debug!(%continuous, name, "Stopped");
        Ok(())
    }

    /// Whether a continuous takes part in integration.
    pub fn is_active(&self, continuous: ContinuousId) -> Result<bool, SimError> {
        Ok(self.kernel()?.system.is_active(continuous)?)
    }

    /// Current state of a variable.
    pub fn state(&self, variable: VariableId) -> Result<f64, SimError> {
        Ok(self.kernel()?.system.state(variable)?)
    }

    /// Overwrite the state of a variable. Takes effect on the next advance.
    pub fn set_state(&self, variable: VariableId, value: f64) -> Result<(), SimError> {
        check_finite("state", value)?;
        Ok(self.kernel_mut()?.system.set_state(variable, value)?)
    }

    /// Rate of a variable as of the last integration advance.
    pub fn rate(&self, variable: VariableId) -> Result<f64, SimError> {
        Ok(self.kernel()?.system.rate(variable)?)
    }

    /// The continuous a variable belongs to.
    pub fn owner(&self, variable: VariableId) -> Result<ContinuousId, SimError> {
        Ok(self.kernel()?.system.owner(variable)?)
    }

    /// Counters of the run so far.
    pub fn stats(&self) -> SimulationStats {
        self.kernel.borrow().stats.clone()
    }
}
