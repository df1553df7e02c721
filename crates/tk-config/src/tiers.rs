//! Typed tier configuration and its validation boundary.
//!
//! [`TierConfig::from_json`] is the only place the "exactly one default tier"
//! invariant is checked. The default policy is extracted there and handed out
//! explicitly by [`TierConfig::default_policy`]; nothing downstream scans for
//! it again.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tk_schemas::{AggregateOverrides, DurationError, RetentionPolicy, TierDuration};

pub const DEFAULT_LEGACY_POLICY: &str = "autogen";
pub const DEFAULT_BOOKKEEPING_MEASUREMENT: &str = "grafana_rp";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The configuration cannot be used; detected before any backend IO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON tree does not match the expected shape.
    Shape(String),
    EmptyDatabase,
    EmptyLegacyPolicy,
    EmptyPolicyName { index: usize },
    DuplicatePolicyName { name: String },
    NoDefaultPolicy,
    MultipleDefaultPolicies { names: Vec<String> },
    InvalidDuration {
        policy: String,
        field: &'static str,
        source: DurationError,
    },
    /// A resolution must be a finite bucket width.
    InfiniteResolution { policy: String },
    /// Two tiers would derive identical continuous query names.
    DuplicateResolution {
        resolution: String,
        policies: Vec<String>,
    },
    /// The legacy tier is migrated away from and cannot also be a managed tier.
    LegacyIsManagedTier { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(msg) => write!(f, "CONFIG_INVALID_SHAPE: {msg}"),
            Self::EmptyDatabase => write!(f, "CONFIG_EMPTY_DATABASE: connection.database is empty"),
            Self::EmptyLegacyPolicy => {
                write!(f, "CONFIG_EMPTY_LEGACY_POLICY: legacy_retention_policy is empty")
            }
            Self::EmptyPolicyName { index } => {
                write!(f, "CONFIG_EMPTY_POLICY_NAME: retention_policies[{index}] has no name")
            }
            Self::DuplicatePolicyName { name } => {
                write!(f, "CONFIG_DUPLICATE_POLICY: '{name}' is configured more than once")
            }
            Self::NoDefaultPolicy => write!(
                f,
                "CONFIG_NO_DEFAULT_POLICY: exactly one retention policy must set `default: true`"
            ),
            Self::MultipleDefaultPolicies { names } => write!(
                f,
                "CONFIG_MULTIPLE_DEFAULT_POLICIES: exactly one retention policy may be default, got {names:?}"
            ),
            Self::InvalidDuration {
                policy,
                field,
                source,
            } => write!(f, "CONFIG_INVALID_DURATION: policy '{policy}' {field}: {source}"),
            Self::InfiniteResolution { policy } => write!(
                f,
                "CONFIG_INFINITE_RESOLUTION: policy '{policy}' resolution must be finite"
            ),
            Self::DuplicateResolution {
                resolution,
                policies,
            } => write!(
                f,
                "CONFIG_DUPLICATE_RESOLUTION: policies {policies:?} share resolution '{resolution}' \
                 and would derive colliding continuous query names"
            ),
            Self::LegacyIsManagedTier { name } => write!(
                f,
                "CONFIG_LEGACY_IS_MANAGED: legacy policy '{name}' is also listed in retention_policies"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Raw shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTierConfig {
    connection: RawConnection,
    #[serde(default = "default_legacy")]
    legacy_retention_policy: String,
    #[serde(default)]
    retention_policies: Vec<RawPolicy>,
    #[serde(default)]
    aggregates: AggregateOverrides,
    #[serde(default)]
    bookkeeping: RawBookkeeping,
}

#[derive(Debug, Deserialize)]
struct RawConnection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    protocol: Protocol,
    database: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password_env: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    name: String,
    duration: String,
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawBookkeeping {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    measurement: Option<String>,
}

fn default_legacy() -> String {
    DEFAULT_LEGACY_POLICY.to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8086
}

// ---------------------------------------------------------------------------
// Validated config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Backend connection parameters. Opaque to the planning core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub database: String,
    pub username: Option<String>,
    /// Name of the env var holding the password (never the value).
    pub password_env: Option<String>,
}

impl ConnectionConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookkeepingConfig {
    pub enabled: bool,
    pub measurement: String,
}

/// Validated tier configuration.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub connection: ConnectionConfig,
    pub legacy_policy: String,
    policies: Vec<RetentionPolicy>,
    default_index: usize,
    pub aggregates: AggregateOverrides,
    pub bookkeeping: BookkeepingConfig,
}

impl TierConfig {
    /// Parse and validate the merged config tree.
    pub fn from_json(config_json: &Value) -> Result<Self, ConfigError> {
        let raw: RawTierConfig = serde_json::from_value(config_json.clone())
            .map_err(|e| ConfigError::Shape(e.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawTierConfig) -> Result<Self, ConfigError> {
        let database = raw.connection.database.trim().to_string();
        if database.is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        let legacy_policy = raw.legacy_retention_policy.trim().to_string();
        if legacy_policy.is_empty() {
            return Err(ConfigError::EmptyLegacyPolicy);
        }

        let mut policies: Vec<RetentionPolicy> = Vec::with_capacity(raw.retention_policies.len());
        for (index, rp) in raw.retention_policies.into_iter().enumerate() {
            let name = rp.name.trim().to_string();
            if name.is_empty() {
                return Err(ConfigError::EmptyPolicyName { index });
            }
            if policies.iter().any(|p| p.name == name) {
                return Err(ConfigError::DuplicatePolicyName { name });
            }
            if name == legacy_policy {
                return Err(ConfigError::LegacyIsManagedTier { name });
            }

            let duration =
                TierDuration::parse(&rp.duration).map_err(|source| ConfigError::InvalidDuration {
                    policy: name.clone(),
                    field: "duration",
                    source,
                })?;

            let resolution = match rp.resolution.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(lit) => {
                    let r = TierDuration::parse(lit).map_err(|source| {
                        ConfigError::InvalidDuration {
                            policy: name.clone(),
                            field: "resolution",
                            source,
                        }
                    })?;
                    if r.is_infinite() {
                        return Err(ConfigError::InfiniteResolution { policy: name });
                    }
                    Some(r)
                }
            };

            policies.push(RetentionPolicy::new(name, duration, resolution, rp.default));
        }

        let defaults: Vec<usize> = policies
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_default)
            .map(|(i, _)| i)
            .collect();
        let default_index = match defaults.as_slice() {
            [] => return Err(ConfigError::NoDefaultPolicy),
            [one] => *one,
            many => {
                return Err(ConfigError::MultipleDefaultPolicies {
                    names: many.iter().map(|i| policies[*i].name.clone()).collect(),
                })
            }
        };

        // CQ names derive from the resolution literal; a shared literal collides.
        let mut by_resolution: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for p in policies.iter().filter(|p| !p.is_default) {
            if let Some(r) = &p.resolution {
                by_resolution
                    .entry(r.literal())
                    .or_default()
                    .push(p.name.clone());
            }
        }
        if let Some((resolution, names)) = by_resolution.into_iter().find(|(_, v)| v.len() > 1) {
            return Err(ConfigError::DuplicateResolution {
                resolution: resolution.to_string(),
                policies: names,
            });
        }

        let measurement = raw
            .bookkeeping
            .measurement
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_BOOKKEEPING_MEASUREMENT.to_string());

        Ok(Self {
            connection: ConnectionConfig {
                host: raw.connection.host.trim().to_string(),
                port: raw.connection.port,
                protocol: raw.connection.protocol,
                database,
                username: raw
                    .connection
                    .username
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty()),
                password_env: raw
                    .connection
                    .password_env
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
            },
            legacy_policy,
            policies,
            default_index,
            aggregates: raw.aggregates,
            bookkeeping: BookkeepingConfig {
                enabled: raw.bookkeeping.enabled.unwrap_or(true),
                measurement,
            },
        })
    }

    pub fn database(&self) -> &str {
        &self.connection.database
    }

    /// All tiers in configured order.
    pub fn policies(&self) -> &[RetentionPolicy] {
        &self.policies
    }

    /// The single default tier (validated at load).
    pub fn default_policy(&self) -> &RetentionPolicy {
        &self.policies[self.default_index]
    }

    pub fn non_default_policies(&self) -> impl Iterator<Item = &RetentionPolicy> {
        self.policies.iter().filter(|p| !p.is_default)
    }

    /// Non-default tiers with a resolution: the downsampling targets.
    pub fn downsampling_policies(&self) -> impl Iterator<Item = &RetentionPolicy> {
        self.non_default_policies().filter(|p| p.resolution.is_some())
    }

    /// First tier with infinite duration; holds bookkeeping points.
    pub fn infinite_policy(&self) -> Option<&RetentionPolicy> {
        self.policies.iter().find(|p| p.duration.is_infinite())
    }
}
