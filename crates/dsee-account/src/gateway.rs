//! Single-connection gateway used by the account engines.

use crate::{
    dn::DistinguishedName,
    session::{DirectoryModification, DirectorySession, LdapEntry, SearchScope},
    Result,
};
use dsee_core::{Error, ServiceCredentials};
use tracing::debug;

/// Wraps one directory session.
///
/// Engines receive the gateway explicitly for every call; holding `&mut DirectoryGateway` for
/// the span of a bind followed by a read or modify keeps that pair free of interleaving.
pub struct DirectoryGateway {
    session: Box<dyn DirectorySession>,
}

impl DirectoryGateway {
    /// Wraps an open session.
    #[must_use]
    pub fn new(session: Box<dyn DirectorySession>) -> Self {
        Self { session }
    }

    /// Looks up `attribute` on the first entry matched by `filter` under `base`.
    ///
    /// Returns `None` when nothing matches or when the first match lacks the attribute. Callers
    /// cannot tell the two cases apart.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::SearchFailure`] and transport errors.
    pub async fn search(
        &mut self,
        base: &DistinguishedName,
        scope: SearchScope,
        filter: &str,
        attribute: &'static str,
    ) -> Result<Option<LdapEntry>> {
        debug!(base = %base, ?scope, filter, attribute, "directory search");
        let entries = self
            .session
            .search(base.as_str(), scope, filter, &[attribute])
            .await?;

        Ok(entries
            .into_iter()
            .next()
            .filter(|entry| entry.has_attribute(attribute)))
    }

    /// Binds as `dn`. A rejected credential yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns transport and server errors other than a rejected credential.
    pub async fn bind(&mut self, dn: &str, credential: &str) -> Result<bool> {
        match self.session.simple_bind(dn, credential).await {
            Ok(()) => Ok(true),
            Err(Error::BindFailure(_)) => {
                debug!(dn, "bind rejected");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Binds as the privileged service identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindFailure`] when the service credential is rejected.
    pub async fn bind_service(&mut self, credentials: &ServiceCredentials) -> Result<()> {
        self.session
            .simple_bind(credentials.bind_dn(), credentials.bind_password())
            .await
    }

    /// Applies a single modification to `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryError`] carrying the server result code.
    pub async fn modify(
        &mut self,
        dn: &DistinguishedName,
        change: DirectoryModification,
    ) -> Result<()> {
        debug!(
            dn = %dn,
            attribute = %change.attribute,
            operation = ?change.operation,
            "directory modify"
        );
        self.session.modify(dn.as_str(), &[change]).await
    }

    /// Unbinds and drops the session.
    ///
    /// # Errors
    ///
    /// Returns the transport error raised by the unbind request.
    pub async fn close(mut self) -> Result<()> {
        self.session.unbind().await
    }
}
