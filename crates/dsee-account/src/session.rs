//! Directory transport: the session seam and its `ldap3` implementation.

use crate::{config::DirectoryConfig, Result};
use async_trait::async_trait;
use dsee_core::error::{
    Error, RESULT_CODE_INVALID_CREDENTIALS, RESULT_CODE_NO_SUCH_OBJECT,
};
use ldap3::{
    LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, ResultEntry, Scope,
    SearchEntry, SearchResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// LDAP result code `other`, used for client-side failures of a modify request.
const RESULT_CODE_OTHER: u32 = 80;

/// Represents the search scope for directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// The base entry and all its descendants.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Directory entry as returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserve the order sent by the server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute with a single value.
    #[must_use]
    pub fn with_attribute(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes
            .entry(attribute.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns all values for the attribute. Names are matched case-insensitively.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns true if the attribute is present with at least one value.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.values(attribute)
            .is_some_and(|values| !values.is_empty())
    }
}

/// Kind of change a [`DirectoryModification`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOperation {
    /// Add values; the server rejects values that already exist.
    Add,
    /// Delete values, or the whole attribute when no values are given.
    Delete,
    /// Replace every value.
    Replace,
}

/// One attribute change within a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryModification {
    /// Kind of change.
    pub operation: ModifyOperation,
    /// Attribute name, as sent on the wire.
    pub attribute: String,
    /// Values the change carries.
    pub values: Vec<String>,
}

impl DirectoryModification {
    fn single(operation: ModifyOperation, attribute: &str, values: Vec<String>) -> Self {
        Self {
            operation,
            attribute: attribute.to_string(),
            values,
        }
    }

    /// Adds one value.
    #[must_use]
    pub fn add(attribute: &str, value: impl Into<String>) -> Self {
        Self::single(ModifyOperation::Add, attribute, vec![value.into()])
    }

    /// Deletes one value, leaving the others.
    #[must_use]
    pub fn delete_value(attribute: &str, value: impl Into<String>) -> Self {
        Self::single(ModifyOperation::Delete, attribute, vec![value.into()])
    }

    /// Deletes the attribute.
    #[must_use]
    pub fn delete_all(attribute: &str) -> Self {
        Self::single(ModifyOperation::Delete, attribute, Vec::new())
    }

    /// Sets the attribute to exactly one value.
    #[must_use]
    pub fn replace(attribute: &str, value: impl Into<String>) -> Self {
        Self::single(ModifyOperation::Replace, attribute, vec![value.into()])
    }

    fn into_mod(self) -> Mod<String> {
        let values: HashSet<String> = self.values.into_iter().collect();
        match self.operation {
            ModifyOperation::Add => Mod::Add(self.attribute, values),
            ModifyOperation::Delete => Mod::Delete(self.attribute, values),
            ModifyOperation::Replace => Mod::Replace(self.attribute, values),
        }
    }
}

/// One authenticated (or anonymous) connection to the directory.
///
/// A bind changes the identity used by every later request on the same session, so a session
/// must never be shared between concurrent callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySession: Send {
    /// Binds the session as `dn`. Fails with [`Error::BindFailure`] on a wrong credential.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Runs a search and returns every matching entry.
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;

    /// Applies the modifications to `dn` in a single request.
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;

    /// Closes the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens new directory sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Opens an unbound session.
    async fn connect(&self) -> Result<Box<dyn DirectorySession>>;
}

/// Connector backed by `ldap3`.
pub struct LdapDirectoryConnector {
    config: Arc<DirectoryConfig>,
}

impl LdapDirectoryConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectoryConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>> {
        let url = self.config.url();
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.connection_timeout());
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|err| Error::ConnectionFailed(format!("{url}: {err}")))?;
        ldap3::drive!(conn);
        debug!(url = %url, "opened directory connection");

        Ok(Box::new(LdapDirectorySession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct LdapDirectorySession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

impl LdapDirectorySession {
    /// Arms the per-operation timeout for the next request. `ldap3` abandons the request on
    /// the server when it expires.
    fn timed(&mut self) -> &mut ldap3::Ldap {
        self.inner.with_timeout(self.operation_timeout)
    }
}

/// Maps a client-side failure; an expired operation timeout becomes [`Error::Timeout`].
fn client_failure(
    operation: &str,
    err: LdapError,
    otherwise: impl FnOnce(String) -> Error,
) -> Error {
    match err {
        LdapError::Timeout { .. } => Error::Timeout(format!("directory {operation} timed out")),
        err => otherwise(err.to_string()),
    }
}

fn bind_outcome(dn: &str, result: LdapResult) -> Result<()> {
    match result.rc {
        0 => Ok(()),
        RESULT_CODE_INVALID_CREDENTIALS => Err(Error::BindFailure(dn.to_string())),
        rc => Err(Error::DirectoryError {
            result_code: rc,
            message: result.text,
        }),
    }
}

fn search_outcome(
    base_dn: &str,
    entries: Vec<ResultEntry>,
    status: LdapResult,
) -> Result<Vec<LdapEntry>> {
    match status.rc {
        0 => {}
        // A missing base behaves like an empty result.
        RESULT_CODE_NO_SUCH_OBJECT => return Ok(Vec::new()),
        rc => {
            return Err(Error::SearchFailure(format!(
                "{base_dn}: {} (result code {rc})",
                status.text
            )))
        }
    }

    Ok(entries
        .into_iter()
        .map(SearchEntry::construct)
        .map(|entry| LdapEntry {
            dn: entry.dn,
            attributes: entry.attrs,
        })
        .collect())
}

fn modify_outcome(result: LdapResult) -> Result<()> {
    match result.rc {
        0 => Ok(()),
        rc => Err(Error::DirectoryError {
            result_code: rc,
            message: result.text,
        }),
    }
}

#[async_trait]
impl DirectorySession for LdapDirectorySession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .timed()
            .simple_bind(dn, password)
            .await
            .map_err(|err| client_failure("bind", err, Error::ConnectionFailed))?;
        bind_outcome(dn, result)
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let SearchResult(entries, status) = self
            .timed()
            .search(base_dn, scope.into(), filter, attributes.to_vec())
            .await
            .map_err(|err| client_failure("search", err, Error::SearchFailure))?;
        search_outcome(base_dn, entries, status)
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods = modifications
            .iter()
            .cloned()
            .map(DirectoryModification::into_mod)
            .collect::<Vec<_>>();

        let result = self
            .timed()
            .modify(dn, mods)
            .await
            .map_err(|err| {
                client_failure("modify", err, |message| Error::DirectoryError {
                    result_code: RESULT_CODE_OTHER,
                    message,
                })
            })?;
        modify_outcome(result)
    }

    async fn unbind(&mut self) -> Result<()> {
        self.timed()
            .unbind()
            .await
            .map_err(|err| client_failure("unbind", err, Error::ConnectionFailed))
    }
}
