//! Account status derivation.

use crate::{
    account::AccountId,
    attributes,
    gateway::DirectoryGateway,
    session::SearchScope,
    Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of an account, derived from its attributes on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Locked out by the server (e.g. after failed binds).
    Locked,
    /// Administratively deactivated.
    Inactive,
    /// Neither locked nor deactivated.
    Active,
}

impl AccountStatus {
    /// Applies the precedence rule: a lockout wins over deactivation.
    #[must_use]
    pub const fn from_flags(locked_out: bool, deactivated: bool) -> Self {
        if locked_out {
            Self::Locked
        } else if deactivated {
            Self::Inactive
        } else {
            Self::Active
        }
    }

    /// Returns the display name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "Locked",
            Self::Inactive => "Inactive",
            Self::Active => "Active",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes [`AccountStatus`] from directory attributes.
///
/// Every check issues its own subtree search by `uid` below the account's container. An account
/// that cannot be found reads as having none of the attributes, so it reports
/// [`AccountStatus::Active`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountStatusEngine;

impl AccountStatusEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Derives the status: `Locked` if `accountunlocktime` is present, else `Inactive` if
    /// `nsaccountlock` is present, else `Active`.
    ///
    /// # Errors
    ///
    /// Propagates search failures.
    pub async fn status(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<AccountStatus> {
        if self.is_locked(gateway, account).await? {
            return Ok(AccountStatus::Locked);
        }

        let deactivated = self
            .has_attribute(gateway, account, attributes::ACCOUNT_LOCK)
            .await?;
        Ok(AccountStatus::from_flags(false, deactivated))
    }

    /// Returns true while the server holds a lockout on the account.
    ///
    /// # Errors
    ///
    /// Propagates search failures.
    pub async fn is_locked(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<bool> {
        self.has_attribute(gateway, account, attributes::ACCOUNT_UNLOCK_TIME)
            .await
    }

    /// Returns true unless the account carries the deactivation flag.
    ///
    /// # Errors
    ///
    /// Propagates search failures.
    pub async fn is_active(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<bool> {
        self.has_attribute(gateway, account, attributes::ACCOUNT_LOCK)
            .await
            .map(|deactivated| !deactivated)
    }

    async fn has_attribute(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
        attribute: &'static str,
    ) -> Result<bool> {
        gateway
            .search(
                account.container(),
                SearchScope::Subtree,
                &account.uid_filter(),
                attribute,
            )
            .await
            .map(|entry| entry.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::DistinguishedName;
    use crate::session::{LdapEntry, MockDirectorySession};
    use dsee_core::Error;
    use mockall::Sequence;

    fn account() -> AccountId {
        AccountId::new(
            "jdoe",
            DistinguishedName::parse("ou=people,dc=example,dc=com").unwrap(),
        )
        .unwrap()
    }

    fn entry_with(attributes: &[&str]) -> Vec<LdapEntry> {
        let entry = attributes.iter().fold(
            LdapEntry::new("uid=jdoe,ou=people,dc=example,dc=com"),
            |entry, attribute| entry.with_attribute(*attribute, "x"),
        );
        vec![entry]
    }

    #[test]
    fn precedence_table() {
        assert_eq!(AccountStatus::from_flags(true, true), AccountStatus::Locked);
        assert_eq!(AccountStatus::from_flags(true, false), AccountStatus::Locked);
        assert_eq!(AccountStatus::from_flags(false, true), AccountStatus::Inactive);
        assert_eq!(AccountStatus::from_flags(false, false), AccountStatus::Active);
        assert_eq!(AccountStatus::Inactive.to_string(), "Inactive");
    }

    #[tokio::test]
    async fn lockout_short_circuits() {
        let mut session = MockDirectorySession::new();
        session
            .expect_search()
            .withf(|_, _, filter, attributes| {
                filter == "(uid=jdoe)" && attributes == ["accountunlocktime"]
            })
            .times(1)
            .returning(|_, _, _, _| Ok(entry_with(&["accountunlocktime", "nsaccountlock"])));

        let mut gateway = DirectoryGateway::new(Box::new(session));
        let status = AccountStatusEngine::new()
            .status(&mut gateway, &account())
            .await
            .unwrap();
        assert_eq!(status, AccountStatus::Locked);
    }

    #[tokio::test]
    async fn deactivation_checked_second() {
        let mut session = MockDirectorySession::new();
        let mut seq = Sequence::new();
        session
            .expect_search()
            .withf(|_, _, _, attributes| attributes == ["accountunlocktime"])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(entry_with(&[])));
        session
            .expect_search()
            .withf(|_, _, _, attributes| attributes == ["nsaccountlock"])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(entry_with(&["nsaccountlock"])));

        let mut gateway = DirectoryGateway::new(Box::new(session));
        let status = AccountStatusEngine::new()
            .status(&mut gateway, &account())
            .await
            .unwrap();
        assert_eq!(status, AccountStatus::Inactive);
    }

    #[tokio::test]
    async fn unknown_account_reads_as_active() {
        let mut session = MockDirectorySession::new();
        session
            .expect_search()
            .times(2)
            .returning(|_, _, _, _| Ok(Vec::new()));

        let mut gateway = DirectoryGateway::new(Box::new(session));
        let engine = AccountStatusEngine::new();
        assert_eq!(
            engine.status(&mut gateway, &account()).await,
            Ok(AccountStatus::Active)
        );
    }

    #[tokio::test]
    async fn is_active_and_is_locked() {
        let mut session = MockDirectorySession::new();
        session
            .expect_search()
            .withf(|_, _, _, attributes| attributes == ["nsaccountlock"])
            .returning(|_, _, _, _| Ok(entry_with(&["nsaccountlock"])));
        session
            .expect_search()
            .withf(|_, _, _, attributes| attributes == ["accountunlocktime"])
            .returning(|_, _, _, _| Ok(entry_with(&["nsaccountlock"])));

        let mut gateway = DirectoryGateway::new(Box::new(session));
        let engine = AccountStatusEngine::new();
        assert_eq!(engine.is_active(&mut gateway, &account()).await, Ok(false));
        assert_eq!(engine.is_locked(&mut gateway, &account()).await, Ok(false));
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        let mut session = MockDirectorySession::new();
        session
            .expect_search()
            .returning(|_, _, _, _| Err(Error::SearchFailure("unavailable".to_string())));

        let mut gateway = DirectoryGateway::new(Box::new(session));
        let result = AccountStatusEngine::new()
            .status(&mut gateway, &account())
            .await;
        assert!(matches!(result, Err(Error::SearchFailure(_))));
    }
}
