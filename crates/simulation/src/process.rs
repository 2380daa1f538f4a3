//! Processes and the suspension primitives available to their bodies.
//!
//! A process body is an `async` block. It runs until it awaits one of the
//! suspension primitives on its [`ProcessContext`] ([`hold`], [`passivate`],
//! [`wait_until`]) or finishes. Suspension can happen at any call depth:
//! helper `async fn`s that take the context and await a primitive suspend
//! the whole body.
//!
//! The dispatcher polls exactly one body at a time, so only one body ever
//! executes ("quasi-parallelism"). Shared model state is therefore usually
//! kept in `Rc<RefCell<_>>`; a borrow must not be held across an `.await`.
//!
//! [`hold`]: ProcessContext::hold
//! [`passivate`]: ProcessContext::passivate
//! [`wait_until`]: ProcessContext::wait_until

use crate::continuous::StateView;
use crate::{SimError, SimHandle};
use disco_types::SimTime;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u32);

impl ProcessId {
    pub(crate) fn new(index: usize) -> Self {
        ProcessId(index as u32)
    }

    /// Position of the process in its simulation (creation order).
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// Lifecycle state of a process.
///
/// ```text
///   NotStarted ──activate──▶ Scheduled ──dispatch──▶ Active ──body ends──▶ Terminated
///                               ▲  │                  │  │
///                               │  └─cancel─▶ Passive ◀┘  └─hold─▶ Scheduled
///                               └───activate────┘  passivate / wait_until
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Created, never activated.
    NotStarted,
    /// Its body is running right now.
    Active,
    /// Has a pending entry in the event list.
    Scheduled,
    /// Suspended without a pending entry.
    Passive,
    /// Body has finished. Can never run again.
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::NotStarted => "not started",
            ProcessState::Active => "active",
            ProcessState::Scheduled => "scheduled",
            ProcessState::Passive => "passive",
            ProcessState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Boxed process body.
pub(crate) type Body = LocalBoxFuture<'static, Result<(), SimError>>;

/// Condition of a `wait_until`.
pub(crate) type Condition = Box<dyn Fn(&StateView<'_>) -> bool>;

/// Handle given to a process body.
///
/// Dereferences to [`SimHandle`] for the non-suspending operations
/// (`activate`, `cancel`, `time`, variable access, ...).
#[derive(Clone)]
pub struct ProcessContext {
    handle: SimHandle,
    id: ProcessId,
}

impl ProcessContext {
    pub(crate) fn new(handle: SimHandle, id: ProcessId) -> Self {
        Self { handle, id }
    }

    /// The process this context belongs to.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// The underlying simulation handle.
    pub fn handle(&self) -> &SimHandle {
        &self.handle
    }

    /// Suspend for `duration` units of simulated time.
    ///
    /// `hold(0.0)` yields to every process already scheduled for the
    /// current time. A negative duration fails with
    /// [`ProgrammerError::NegativeHold`](crate::ProgrammerError::NegativeHold).
    pub async fn hold(&self, duration: f64) -> Result<(), SimError> {
        self.handle.hold(self.id, duration)?;
        Park::default().await;
        Ok(())
    }

    /// Suspend until some other process activates this one.
    pub async fn passivate(&self) -> Result<(), SimError> {
        self.handle.passivate(self.id)?;
        Park::default().await;
        Ok(())
    }

    /// Suspend until `condition` holds.
    ///
    /// The condition is checked after every discrete event and after every
    /// integration sub-step; a crossing during integration is located to
    /// within the configured `min_step`. Returns at once, without
    /// suspending, if the condition already holds. An explicit `activate`
    /// of the waiting process also ends the wait.
    ///
    /// The condition must read states through the [`StateView`] it is
    /// given; the simulation handle is unavailable while it runs.
    pub async fn wait_until<F>(&self, condition: F) -> Result<(), SimError>
    where
        F: Fn(&StateView<'_>) -> bool + 'static,
    {
        if self.handle.wait_until(self.id, Box::new(condition))? {
            Park::default().await;
        }
        Ok(())
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.handle.time()
    }
}

impl Deref for ProcessContext {
    type Target = SimHandle;

    fn deref(&self) -> &SimHandle {
        &self.handle
    }
}

/// Returns `Pending` once, handing control back to the dispatcher, and
/// `Ready` when the dispatcher resumes the body.
#[derive(Default)]
struct Park {
    parked: bool,
}

impl Future for Park {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.parked {
            Poll::Ready(())
        } else {
            self.parked = true;
            Poll::Pending
        }
    }
}
