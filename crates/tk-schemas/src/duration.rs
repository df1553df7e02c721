//! Duration literals for retention tiers and downsampling resolutions.
//!
//! # Normalization
//! Every literal is normalized to an integer count of nanosecond ticks. Two
//! durations are equal iff their tick counts are equal, so `1h`, `60m` and the
//! backend's echoed `1h0m0s` all denote the same tier duration. The literal as
//! written is kept alongside the ticks: statement rendering and continuous
//! query names use it verbatim, equivalence never does.
//!
//! # Infinite retention
//! `INF` / `infinite` (any case) and any zero-valued literal (`0s`, which is
//! how InfluxDB echoes an infinite policy) map to [`INFINITE_TICKS`]. The
//! sentinel is never used as a computed bound: callers check
//! [`TierDuration::is_infinite`] and skip time filtering instead.

use std::fmt;

use serde::{Serialize, Serializer};

/// Largest timestamp (nanoseconds since epoch) InfluxDB accepts.
pub const INFINITE_TICKS: i64 = 9_223_372_036_854_775_806;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A duration literal could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// The literal was empty or whitespace only.
    Empty,
    /// A magnitude was not followed by a unit (`"10"`).
    MissingUnit { literal: String },
    /// The unit suffix is not one of ns, us, µs, ms, s, m, h, d, w.
    UnknownUnit { literal: String, unit: String },
    /// A segment did not start with an integer magnitude (`"h"`, `"1.5h"`).
    InvalidMagnitude { literal: String },
    /// The tick count does not fit in an `i64`.
    Overflow { literal: String },
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "INVALID_DURATION: empty duration literal"),
            Self::MissingUnit { literal } => {
                write!(f, "INVALID_DURATION: '{literal}' has no unit suffix")
            }
            Self::UnknownUnit { literal, unit } => write!(
                f,
                "INVALID_DURATION: '{literal}' has unrecognised unit '{unit}' \
                 (expected ns | us | ms | s | m | h | d | w | INF)"
            ),
            Self::InvalidMagnitude { literal } => {
                write!(f, "INVALID_DURATION: '{literal}' has no integer magnitude")
            }
            Self::Overflow { literal } => {
                write!(f, "INVALID_DURATION: '{literal}' overflows nanosecond ticks")
            }
        }
    }
}

impl std::error::Error for DurationError {}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

fn unit_ticks(unit: &str) -> Option<i64> {
    match unit {
        "ns" => Some(1),
        "u" | "us" | "µ" | "µs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        "d" => Some(NANOS_PER_DAY),
        "w" => Some(NANOS_PER_WEEK),
        _ => None,
    }
}

fn is_infinite_keyword(s: &str) -> bool {
    s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinite")
}

/// Normalize a duration literal to nanosecond ticks.
///
/// Accepts a single segment (`7d`) or a compound literal (`168h0m0s`).
/// Returns [`INFINITE_TICKS`] for the infinite keyword and for zero.
pub fn normalize(literal: &str) -> Result<i64, DurationError> {
    let s = literal.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if is_infinite_keyword(s) {
        return Ok(INFINITE_TICKS);
    }

    let overflow = || DurationError::Overflow {
        literal: s.to_string(),
    };

    let mut total: i64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(DurationError::InvalidMagnitude {
                literal: s.to_string(),
            });
        }
        let magnitude: i64 = rest[..digits_end].parse().map_err(|_| overflow())?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        if unit.is_empty() {
            return Err(DurationError::MissingUnit {
                literal: s.to_string(),
            });
        }
        let per = unit_ticks(unit).ok_or_else(|| DurationError::UnknownUnit {
            literal: s.to_string(),
            unit: unit.to_string(),
        })?;
        rest = &rest[unit_end..];

        let segment = magnitude.checked_mul(per).ok_or_else(overflow)?;
        total = total.checked_add(segment).ok_or_else(overflow)?;
    }

    if total == 0 || total >= INFINITE_TICKS {
        return Ok(INFINITE_TICKS);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// TierDuration
// ---------------------------------------------------------------------------

/// A parsed duration: the literal as written plus its normalized ticks.
///
/// Equality and hashing use ticks only.
#[derive(Debug, Clone)]
pub struct TierDuration {
    literal: String,
    ticks: i64,
}

impl TierDuration {
    pub fn parse(literal: &str) -> Result<Self, DurationError> {
        let ticks = normalize(literal)?;
        Ok(Self {
            literal: literal.trim().to_string(),
            ticks,
        })
    }

    pub fn infinite() -> Self {
        Self {
            literal: "INF".to_string(),
            ticks: INFINITE_TICKS,
        }
    }

    /// The literal exactly as configured (trimmed).
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn is_infinite(&self) -> bool {
        self.ticks == INFINITE_TICKS
    }

    /// Rendering for InfluxQL `DURATION` / `time()` / `now() - x` positions.
    pub fn as_influxql(&self) -> &str {
        if self.is_infinite() {
            "INF"
        } else {
            &self.literal
        }
    }
}

impl PartialEq for TierDuration {
    fn eq(&self, other: &Self) -> bool {
        self.ticks == other.ticks
    }
}

impl Eq for TierDuration {}

impl std::hash::Hash for TierDuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ticks.hash(state);
    }
}

impl fmt::Display for TierDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_influxql())
    }
}

impl Serialize for TierDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_influxql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_equals_sixty_minutes() {
        assert_eq!(normalize("1h"), normalize("60m"));
        assert_eq!(normalize("1h").unwrap(), 3_600 * NANOS_PER_SECOND);
    }

    #[test]
    fn backend_echo_matches_configured_literal() {
        assert_eq!(normalize("168h0m0s"), normalize("7d"));
        assert_eq!(normalize("1w"), normalize("7d"));
        assert_eq!(normalize("1h30m"), normalize("90m"));
    }

    #[test]
    fn sub_second_units() {
        assert_eq!(normalize("1500ms").unwrap(), 1_500 * NANOS_PER_MILLI);
        assert_eq!(normalize("10us"), normalize("10µs"));
        assert_eq!(normalize("10u").unwrap(), 10_000);
        assert_eq!(normalize("7ns").unwrap(), 7);
    }

    #[test]
    fn infinite_keyword_any_case() {
        for lit in ["INF", "inf", "Infinite", "INFINITE", " inf "] {
            assert_eq!(normalize(lit), Ok(INFINITE_TICKS), "literal {lit:?}");
        }
    }

    #[test]
    fn zero_means_infinite() {
        assert_eq!(normalize("0s"), Ok(INFINITE_TICKS));
        assert_eq!(normalize("0h0m0s"), Ok(INFINITE_TICKS));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert_eq!(
            normalize("3x"),
            Err(DurationError::UnknownUnit {
                literal: "3x".to_string(),
                unit: "x".to_string(),
            })
        );
        // Units are case-sensitive, as in InfluxQL.
        assert!(matches!(
            normalize("1H"),
            Err(DurationError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn malformed_literals_are_rejected() {
        assert_eq!(normalize(""), Err(DurationError::Empty));
        assert_eq!(normalize("   "), Err(DurationError::Empty));
        assert!(matches!(
            normalize("10"),
            Err(DurationError::MissingUnit { .. })
        ));
        assert!(matches!(
            normalize("h"),
            Err(DurationError::InvalidMagnitude { .. })
        ));
        assert!(matches!(
            normalize("1.5h"),
            Err(DurationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            normalize("99999999999999999999w"),
            Err(DurationError::Overflow { .. })
        ));
    }

    #[test]
    fn tier_duration_equality_uses_ticks() {
        let a = TierDuration::parse("1d").unwrap();
        let b = TierDuration::parse("24h").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.literal(), "1d");
        assert_eq!(b.literal(), "24h");
        assert_ne!(a, TierDuration::parse("25h").unwrap());
    }

    #[test]
    fn infinite_renders_as_inf() {
        let d = TierDuration::parse("0s").unwrap();
        assert!(d.is_infinite());
        assert_eq!(d.as_influxql(), "INF");
        assert_eq!(d, TierDuration::infinite());
        assert_eq!(TierDuration::parse("2d").unwrap().as_influxql(), "2d");
    }
}
