//! Privileged service identity.
//!
//! Every modification (and the password policy lookup, which lives under `cn=config`) runs after
//! a bind as this identity, never as the end user.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Service bind credentials for the directory.
#[derive(Deserialize)]
pub struct ServiceCredentials {
    bind_dn: String,
    #[serde(deserialize_with = "deserialize_secret")]
    bind_password: SecretString,
}

impl ServiceCredentials {
    /// Create new service credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The distinguished name of the administrative account
    /// * `bind_password` - The administrative password
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
        }
    }

    /// Get the bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .finish()
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
