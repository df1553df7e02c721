//! tk-runtime
//!
//! Reconciliation driver: runs exactly one bootstrap, converge or teardown
//! pass against an injected [`tk_influx::Gateway`] and reports the outcome.
//! Statements are submitted strictly in sequence.

mod driver;
mod error;
mod report;

pub use driver::{bookkeeping_points, Reconciler};
pub use error::RunError;
pub use report::{RunMode, RunReport};
