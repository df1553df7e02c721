//! tk-influx
//!
//! Execution gateway for InfluxDB 1.x: the [`Gateway`] trait, the live HTTP
//! implementation, the dry-run recorder, `/query` response decoding and line
//! protocol encoding.

pub mod dry_run;
pub mod error;
pub mod gateway;
pub mod http;
pub mod introspect;
pub mod line;
pub mod wire;

pub use dry_run::{DryRunGateway, Recorded};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayResult};
pub use http::InfluxHttpGateway;
