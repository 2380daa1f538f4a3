//! Head/Link queue discipline.
//!
//! Every list is a circular doubly linked ring closed by a sentinel
//! [`HeadId`]. Content nodes are [`LinkId`]s. All nodes of all rings live in
//! one [`Ring`] arena and refer to each other by index, so splicing a node in
//! or out is O(1) and no node is ever aliased.
//!
//! ```text
//!        ┌──────────────────────────────────────────┐
//!        ▼                                          │
//!   ┌────────┐  suc  ┌────────┐  suc  ┌────────┐    │
//!   │  Head  │──────▶│ Link a │──────▶│ Link b │────┘
//!   └────────┘◀──────└────────┘◀──────└────────┘
//!        ▲       pred              pred     │
//!        └──────────────────────────────────┘
//! ```
//!
//! A link belongs to at most one ring at a time. Inserting a link somewhere
//! first detaches it from wherever it was, so callers never need to call
//! [`Ring::out`] before moving a link. A detached link is a ring of one
//! (its successor and predecessor are itself).
//!
//! The same discipline is used by the simulation kernel for its event list
//! and by model code for waiting lines.

mod error;
mod ring;

pub use error::QueueError;
pub use ring::{Anchor, HeadId, Iter, LinkId, Ring};
