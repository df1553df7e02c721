//! Credential resolution.
//!
//! Config YAML stores only the NAME of the env var holding the password
//! (`connection.password_env`). The value is read here, once, and handed to
//! the gateway constructor. Errors name the variable, never its value.

use anyhow::{bail, Result};

use crate::tiers::ConnectionConfig;

/// Basic-auth credentials for the backend. **Password is redacted in `Debug`.**
#[derive(Clone)]
pub struct ResolvedCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Returns `None` when no username is configured (unauthenticated backend).
/// A username without a `password_env`, or a named variable that is unset or
/// blank, is an error.
pub fn resolve_credentials(conn: &ConnectionConfig) -> Result<Option<ResolvedCredentials>> {
    let Some(username) = conn.username.clone() else {
        return Ok(None);
    };
    let Some(var_name) = conn.password_env.as_deref() else {
        bail!(
            "CONFIG_MISSING_PASSWORD_ENV: connection.username is set but connection.password_env is not"
        );
    };
    match resolve_env(var_name) {
        Some(password) => Ok(Some(ResolvedCredentials { username, password })),
        None => bail!("SECRET_MISSING: env var '{var_name}' is unset or empty"),
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
