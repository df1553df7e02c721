//! tk-testkit
//!
//! In-memory gateway and fixtures for reconciliation scenarios. Test-only:
//! never a dependency of the binary.

pub mod fake;
pub mod fixtures;

pub use fake::FakeInflux;
