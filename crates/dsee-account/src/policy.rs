//! Password policy resolution.

use crate::{
    account::AccountId,
    attributes,
    dn::DistinguishedName,
    gateway::DirectoryGateway,
    session::SearchScope,
    Result,
};
use dsee_core::Error;
use std::fmt;

/// Location of the password policy entry that governs an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyReference {
    dn: DistinguishedName,
    is_default: bool,
}

impl PolicyReference {
    /// Reference named by the account's `passwordpolicysubentry`.
    #[must_use]
    pub const fn explicit(dn: DistinguishedName) -> Self {
        Self {
            dn,
            is_default: false,
        }
    }

    /// Reference to the global policy, used when the account names none.
    #[must_use]
    pub const fn global(dn: DistinguishedName) -> Self {
        Self {
            dn,
            is_default: true,
        }
    }

    /// Policy entry location.
    #[must_use]
    pub const fn dn(&self) -> &DistinguishedName {
        &self.dn
    }

    /// True when the global policy was substituted.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.is_default
    }
}

impl fmt::Display for PolicyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.dn, f)
    }
}

/// Finds the policy for an account and reads its maximum password age.
#[derive(Debug, Clone)]
pub struct PasswordPolicyResolver {
    default_policy: DistinguishedName,
}

impl PasswordPolicyResolver {
    /// Creates a resolver substituting `default_policy` for accounts without a reference.
    #[must_use]
    pub const fn new(default_policy: DistinguishedName) -> Self {
        Self { default_policy }
    }

    /// Reads `passwordpolicysubentry` for the account, falling back to the global policy.
    ///
    /// # Errors
    ///
    /// Propagates search failures and returns [`Error::InvalidDistinguishedName`] when the
    /// reference is malformed.
    pub async fn effective_policy(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<PolicyReference> {
        let entry = gateway
            .search(
                account.container(),
                SearchScope::Subtree,
                &account.uid_filter(),
                attributes::PASSWORD_POLICY_SUBENTRY,
            )
            .await?;

        match entry
            .as_ref()
            .and_then(|entry| entry.first(attributes::PASSWORD_POLICY_SUBENTRY))
        {
            Some(reference) => Ok(PolicyReference::explicit(DistinguishedName::parse(
                reference,
            )?)),
            None => Ok(PolicyReference::global(self.default_policy.clone())),
        }
    }

    /// Reads `pwdMaxAge` from the policy entry with a base-scope lookup.
    ///
    /// Zero is returned as is and means passwords never expire; a missing entry or attribute is
    /// [`Error::PolicyNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolicyNotFound`], [`Error::InvalidAttribute`] for a non-numeric or
    /// negative value, or the search failure.
    pub async fn max_age(
        &self,
        gateway: &mut DirectoryGateway,
        policy: &PolicyReference,
    ) -> Result<u64> {
        let entry = gateway
            .search(
                policy.dn(),
                SearchScope::Base,
                attributes::ANY_OBJECT_FILTER,
                attributes::PWD_MAX_AGE,
            )
            .await?;

        let value = entry
            .as_ref()
            .and_then(|entry| entry.first(attributes::PWD_MAX_AGE))
            .ok_or_else(|| Error::PolicyNotFound(policy.to_string()))?;

        parse_max_age(value)
    }
}

fn parse_max_age(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidAttribute {
            attribute: attributes::PWD_MAX_AGE.to_string(),
            value: value.to_string(),
        })
}
