//! Staged, cancellable scan pipeline (§4.8, §5).
//!
//! Six stages run in a fixed order — fetch, inventory, metadata extraction,
//! gate validation, report generation, cleanup — each contributing a
//! declared share of overall progress and each checking the shared
//! [`context::StopSignal`] before starting its unit of work.

pub mod context;
pub mod executor;
pub mod stages;

pub use context::{CancelToken, Deadline, StopSignal};
pub use executor::Pipeline;
pub use stages::{Stage, Workspace};
