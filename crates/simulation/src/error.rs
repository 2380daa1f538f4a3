//! Kernel error types.

use crate::{ContinuousId, ProcessId, ProcessState, VariableId};
use disco_queue::QueueError;
use disco_types::{InputError, SimTime};
use thiserror::Error;

/// A logic error in the model: the kernel was asked to do something that
/// can never be valid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgrammerError {
    /// `hold` was called with a negative duration.
    #[error("negative hold: {duration}")]
    NegativeHold { duration: f64 },

    /// A time or duration was NaN or infinite.
    #[error("invalid time: {time}")]
    InvalidTime { time: f64 },

    /// The process is already scheduled, active or terminated.
    #[error("double activation of {process} (state {state})")]
    DoubleActivation {
        process: ProcessId,
        state: ProcessState,
    },

    /// `cancel` on a process that has no pending event.
    #[error("cancel of {process} which is not scheduled (state {state})")]
    NotScheduled {
        process: ProcessId,
        state: ProcessState,
    },

    /// Any operation on a terminated process.
    #[error("{process} has terminated")]
    Terminated { process: ProcessId },

    /// A suspension primitive was used on behalf of a process that does not
    /// hold control.
    #[error("{process} is not the current process")]
    NotCurrent { process: ProcessId },

    /// A process body suspended on something other than a kernel primitive.
    #[error("{process} suspended outside hold/passivate/wait_until")]
    ForeignSuspension { process: ProcessId },

    /// The process id does not belong to this simulation.
    #[error("unknown process {process}")]
    UnknownProcess { process: ProcessId },

    /// The variable id does not belong to this simulation.
    #[error("unknown variable {variable}")]
    UnknownVariable { variable: VariableId },

    /// The continuous id does not belong to this simulation.
    #[error("unknown continuous {continuous}")]
    UnknownContinuous { continuous: ContinuousId },

    /// A derivative function wrote the rate of a variable it does not own.
    #[error("{writer} wrote the rate of {variable}, which it does not own")]
    ForeignRate {
        variable: VariableId,
        writer: ContinuousId,
    },

    /// The clock was asked to move backwards.
    #[error("clock rewind from {from} to {to}")]
    ClockRewind { from: SimTime, to: SimTime },

    /// The handle was used while the kernel was evaluating a derivative
    /// function or a `wait_until` condition.
    #[error("simulation handle used from inside a derivative or condition")]
    KernelBusy,
}

/// Every failure a run can end with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Logic error in the model.
    #[error("programmer error: {0}")]
    Programmer(#[from] ProgrammerError),

    /// Malformed parameters handed to the kernel or a collaborator.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Event list corruption.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
