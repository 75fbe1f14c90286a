//! Region-batched reconciliation
//!
//! Selected regions are grouped by destination sheet. For each sheet the
//! stale rows recorded in the reference table are deleted bottom-up and the
//! matching staged rows are appended below what remains.

pub mod batch;
pub mod grouping;
pub mod job;
pub mod ranges;
pub mod reference;
pub mod staged;
pub mod summary;

pub use job::Reconciler;
pub use summary::{EXIT_HARD_FAILURE, Response, RunSummary, hard_failure_response};
