//! Account lifecycle management for Sun/Oracle DSEE style LDAP directories.
//!
//! Derives account status (locked out, deactivated, active), computes password expiration from
//! the governing password policy, and applies activation, deactivation and password changes.
//! Every engine takes the [`DirectoryGateway`] it works on as an explicit argument; the
//! [`AccountService`] facade opens one connection per operation.

#![deny(missing_docs)]

pub mod attributes;

mod account;
mod config;
mod dn;
mod expiration;
mod gateway;
mod mutator;
mod policy;
mod service;
mod session;
mod status;
mod time;

pub use account::{escape_filter_value, AccountId};
pub use config::{
    DirectoryConfig, DirectoryScheme, DEFAULT_CONNECTION_TIMEOUT_SECS,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_POLICY_DN,
};
pub use dn::{DistinguishedName, DistinguishedNameError};
pub use expiration::{
    compute_expiration, ExpirationCalculator, ExpirationInstant, SECONDS_PER_DAY,
};
pub use gateway::DirectoryGateway;
pub use mutator::{AccountMutator, FORCED_ROTATION_MAX_AGE_SECS};
pub use policy::{PasswordPolicyResolver, PolicyReference};
pub use service::AccountService;
pub use session::{
    DirectoryConnector, DirectoryModification, DirectorySession, LdapDirectoryConnector,
    LdapEntry, ModifyOperation, SearchScope,
};
pub use status::{AccountStatus, AccountStatusEngine};
pub use time::parse_generalized_time;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dsee_core::Result<T>;
