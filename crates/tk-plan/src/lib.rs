//! tk-plan
//!
//! Planning core for tier reconciliation:
//! - aggregate resolution and InfluxQL rendering
//! - desired-state derivation from config + schema snapshot
//! - continuous-query diff with fuzzy text equivalence
//! - stage-ordered plans for bootstrap, converge and teardown
//! - transfer watermark decisions
//!
//! Deterministic, pure logic. No IO. No clock.

pub mod aggregate;
pub mod desired;
pub mod diff;
pub mod equivalence;
pub mod lifecycle;
pub mod plan;
pub mod synth;
pub mod watermark;

pub use desired::DesiredState;
pub use diff::{diff, Diff, PolicyAdvisory};
pub use equivalence::equivalent;
pub use lifecycle::{plan_bootstrap, plan_teardown};
pub use plan::{Operation, OperationKind, Plan, Stage};
pub use watermark::{resolve_watermark, DestinationExpectation, Watermark, WatermarkUnavailable};
