//! Configuration types for directory access.

use crate::{dn::DistinguishedName, Result};
use dsee_core::ServiceCredentials;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;
/// Global password policy applied to accounts without a `passwordpolicysubentry`.
pub const DEFAULT_POLICY_DN: &str = "cn=Password Policy,cn=config";

/// URL scheme used to reach the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryScheme {
    /// Plain LDAP.
    #[default]
    Ldap,
    /// LDAP over TLS.
    Ldaps,
}

impl fmt::Display for DirectoryScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ldap => f.write_str("ldap"),
            Self::Ldaps => f.write_str("ldaps"),
        }
    }
}

/// Configuration for reaching the directory and acting on accounts.
#[derive(Debug, Deserialize, Validate)]
pub struct DirectoryConfig {
    #[validate(length(min = 1))]
    host: String,
    #[validate(range(min = 1))]
    port: u16,
    #[serde(default)]
    scheme: DirectoryScheme,
    service: ServiceCredentials,
    people_container: DistinguishedName,
    #[serde(default = "default_policy_dn")]
    default_policy_dn: DistinguishedName,
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connection_timeout_secs")]
    connection_timeout_secs: u64,
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_operation_timeout_secs")]
    operation_timeout_secs: u64,
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

fn default_policy_dn() -> DistinguishedName {
    DistinguishedName::root("cn", "config").child("cn", "Password Policy")
}

impl DirectoryConfig {
    /// Creates a new directory configuration.
    ///
    /// # Arguments
    ///
    /// * `host` - Directory server host name
    /// * `port` - Directory server port
    /// * `service` - Privileged identity used for modifications and policy reads
    /// * `people_container` - Container holding end-user entries, used to build bind DNs
    ///
    /// # Errors
    ///
    /// Returns an error if the host or port are invalid.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        service: ServiceCredentials,
        people_container: DistinguishedName,
    ) -> Result<Self> {
        Self {
            host: host.into(),
            port,
            scheme: DirectoryScheme::default(),
            service,
            people_container,
            default_policy_dn: default_policy_dn(),
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
        .validated()
    }

    /// Checks a configuration obtained through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`dsee_core::Error::ValidationError`] naming the invalid fields, or
    /// [`dsee_core::Error::ConfigError`] when the fields do not form a valid URL.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Url::parse(&self.url())?;
        Ok(self)
    }

    /// Returns the directory URL, e.g. `ldap://odsee.example.com:1389`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Returns the directory host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the directory port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the privileged service credentials.
    #[must_use]
    pub const fn service(&self) -> &ServiceCredentials {
        &self.service
    }

    /// Returns the container holding end-user entries.
    #[must_use]
    pub const fn people_container(&self) -> &DistinguishedName {
        &self.people_container
    }

    /// Returns the policy used when an account names none.
    #[must_use]
    pub const fn default_policy_dn(&self) -> &DistinguishedName {
        &self.default_policy_dn
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Selects the URL scheme.
    #[must_use]
    pub const fn with_scheme(mut self, scheme: DirectoryScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Overrides the default password policy location.
    #[must_use]
    pub fn with_default_policy_dn(mut self, dn: DistinguishedName) -> Self {
        self.default_policy_dn = dn;
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}
