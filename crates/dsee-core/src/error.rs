//! Error types for directory account operations.
//!
//! The taxonomy separates failures that callers are expected to see routinely (a wrong
//! password) from failures of the directory itself (searches and modifications that did not
//! complete), so that each read or write path can decide whether to absorb or propagate them.

use thiserror::Error;

/// LDAP result code returned when a modification targets an attribute the entry lacks.
pub const RESULT_CODE_NO_SUCH_ATTRIBUTE: u32 = 16;

/// LDAP result code returned when the base entry of an operation does not exist.
pub const RESULT_CODE_NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code returned by a bind with a wrong credential.
pub const RESULT_CODE_INVALID_CREDENTIALS: u32 = 49;

/// Main error type for directory account operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A bind was rejected (wrong credential or unknown identity)
    #[error("Bind failed for {0}")]
    BindFailure(String),

    /// A search could not be completed
    #[error("Search failed: {0}")]
    SearchFailure(String),

    /// The password policy entry or its max-age attribute does not exist
    #[error("Password policy not found: {0}")]
    PolicyNotFound(String),

    /// An attribute the account is expected to carry is absent
    #[error("Attribute `{attribute}` missing on {entry}")]
    AttributeMissing {
        /// Attribute that was looked up
        attribute: String,
        /// Entry (or search scope) the attribute was expected on
        entry: String,
    },

    /// An attribute value could not be interpreted
    #[error("Invalid value `{value}` for attribute `{attribute}`")]
    InvalidAttribute {
        /// Attribute that held the value
        attribute: String,
        /// Offending value
        value: String,
    },

    /// A modification was rejected by the directory
    #[error("Directory error (result code {result_code}): {message}")]
    DirectoryError {
        /// LDAP result code
        result_code: u32,
        /// Diagnostic message from the server or the client library
        message: String,
    },

    /// Connecting to the directory failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidDistinguishedName(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Specialized result type for directory account operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BindFailure(_) => "BIND_FAILURE",
            Self::SearchFailure(_) => "SEARCH_FAILURE",
            Self::PolicyNotFound(_) => "POLICY_NOT_FOUND",
            Self::AttributeMissing { .. } => "ATTRIBUTE_MISSING",
            Self::InvalidAttribute { .. } => "INVALID_ATTRIBUTE",
            Self::DirectoryError { .. } => "DIRECTORY_ERROR",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::InvalidDistinguishedName(_) => "INVALID_DISTINGUISHED_NAME",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Bind failures and absent data are part of normal operation; infrastructure failures are
    /// not.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::SearchFailure(_)
                | Self::DirectoryError { .. }
                | Self::ConnectionFailed(_)
                | Self::ConfigError(_)
                | Self::Timeout(_)
        )
    }

    /// Returns true if a modification failed because the attribute was already absent.
    #[must_use]
    pub const fn is_no_such_attribute(&self) -> bool {
        matches!(
            self,
            Self::DirectoryError {
                result_code: RESULT_CODE_NO_SUCH_ATTRIBUTE,
                ..
            }
        )
    }

    /// Creates an [`Error::AttributeMissing`] for the given attribute and entry.
    #[must_use]
    pub fn attribute_missing(attribute: &str, entry: impl Into<String>) -> Self {
        Self::AttributeMissing {
            attribute: attribute.to_string(),
            entry: entry.into(),
        }
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
