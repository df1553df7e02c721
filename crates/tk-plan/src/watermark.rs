//! Transfer watermarks.
//!
//! A transfer into a tier that already holds data is bounded by the latest
//! timestamp present there, so already-migrated points are not copied twice.
//! The bound is exclusive: the statement filters `time > T`.
//!
//! Pure, no IO: the caller samples the destination and hands the samples in.

use std::fmt;

use serde::Serialize;

/// Lower bound for a cross-tier transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Watermark {
    /// Copy all history.
    Unbounded,
    /// Copy only points strictly newer than this nanosecond timestamp.
    After(i64),
}

/// What the caller knows about the destination before sampling it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestinationExpectation {
    /// An empty or missing destination means a full transfer.
    MayBeEmpty,
    /// The destination must already hold data; an empty one is an error.
    NonEmpty,
}

/// No timestamp could be determined for a destination that must have one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatermarkUnavailable {
    pub tier: String,
}

impl fmt::Display for WatermarkUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WATERMARK_UNAVAILABLE: tier '{}' is expected to hold data but no latest timestamp was found",
            self.tier
        )
    }
}

impl std::error::Error for WatermarkUnavailable {}

/// Decide the bound from per-measurement latest timestamps of `tier`.
///
/// `destination_exists == false` is treated as "no data".
pub fn resolve_watermark<I>(
    tier: &str,
    destination_exists: bool,
    latest_per_measurement: I,
    expectation: DestinationExpectation,
) -> Result<Watermark, WatermarkUnavailable>
where
    I: IntoIterator<Item = Option<i64>>,
{
    let latest = if destination_exists {
        latest_per_measurement.into_iter().flatten().max()
    } else {
        None
    };
    match (latest, expectation) {
        (Some(ts), _) => Ok(Watermark::After(ts)),
        (None, DestinationExpectation::MayBeEmpty) => Ok(Watermark::Unbounded),
        (None, DestinationExpectation::NonEmpty) => Err(WatermarkUnavailable {
            tier: tier.to_string(),
        }),
    }
}
