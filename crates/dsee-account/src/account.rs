//! Account addressing: username plus parent container.

use crate::{attributes, dn::DistinguishedName, Result};
use dsee_core::Error;
use std::fmt;
use tracing::{debug, warn};

/// Identifies an account entry by its `uid` and the container it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId {
    username: String,
    container: DistinguishedName,
}

impl AccountId {
    /// Creates an account identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] when the username is empty.
    pub fn new(username: impl Into<String>, container: DistinguishedName) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(Error::ValidationError(
                "username cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            username,
            container,
        })
    }

    /// Login name (`uid`).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Parent container of the entry.
    #[must_use]
    pub const fn container(&self) -> &DistinguishedName {
        &self.container
    }

    /// Distinguished name of the entry: `uid=<username>,<container>`.
    #[must_use]
    pub fn dn(&self) -> DistinguishedName {
        self.container.child(attributes::UID, &self.username)
    }

    /// Subtree search filter selecting this account by username.
    #[must_use]
    pub fn uid_filter(&self) -> String {
        format!(
            "({}={})",
            attributes::UID,
            escape_filter_value(&self.username)
        )
    }

    /// Managed role that marks accounts in this container as disabled.
    #[must_use]
    pub fn disabled_role_dn(&self) -> DistinguishedName {
        self.container.child("cn", attributes::DISABLED_ROLE_CN)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dn())
    }
}

/// Escapes a value for use inside a search filter (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Logs a lookup on `account` that produced no answer.
///
/// Infrastructure failures are warnings; a missing policy or attribute is logged at debug level.
pub(crate) fn log_unavailable(account: &AccountId, err: &Error, message: &str) {
    if err.should_log() {
        warn!(account = %account, error = %err, code = err.error_code(), "{message}");
    } else {
        debug!(account = %account, error = %err, code = err.error_code(), "{message}");
    }
}
