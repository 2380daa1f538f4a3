//! Queue errors.

use thiserror::Error;

/// Errors raised by ring operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The link id does not name a live link (never created, or released).
    #[error("unknown link {0}")]
    UnknownLink(crate::LinkId),

    /// The head id does not name a live head.
    #[error("unknown head {0}")]
    UnknownHead(crate::HeadId),
}
