//! Password expiration computation.

use crate::{
    account::{log_unavailable, AccountId},
    attributes,
    gateway::DirectoryGateway,
    policy::PasswordPolicyResolver,
    session::SearchScope,
    time::parse_generalized_time,
    Result,
};
use chrono::{DateTime, Days, Utc};
use dsee_core::{Error, ServiceCredentials};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in a day; `pwdMaxAge` is truncated to whole days.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// When a password stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationInstant {
    /// The password expires at this instant.
    At(DateTime<Utc>),
    /// The policy sets no maximum age.
    Infinite,
}

impl ExpirationInstant {
    /// Returns the instant, or `None` for [`ExpirationInstant::Infinite`].
    #[must_use]
    pub const fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(instant) => Some(*instant),
            Self::Infinite => None,
        }
    }

    /// True once `now` is past the expiration instant. The instant itself is still valid.
    #[must_use]
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::At(instant) => now > *instant,
            Self::Infinite => false,
        }
    }
}

impl fmt::Display for ExpirationInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(instant) => write!(f, "{}", instant.to_rfc3339()),
            Self::Infinite => f.write_str("never"),
        }
    }
}

/// Adds `floor(max_age_seconds / 86400)` days to the change time; zero means no expiration.
///
/// # Errors
///
/// Returns [`Error::InvalidAttribute`] when the result does not fit the calendar.
pub fn compute_expiration(
    password_changed_at: DateTime<Utc>,
    max_age_seconds: u64,
) -> Result<ExpirationInstant> {
    if max_age_seconds == 0 {
        return Ok(ExpirationInstant::Infinite);
    }

    password_changed_at
        .checked_add_days(Days::new(max_age_seconds / SECONDS_PER_DAY))
        .map(ExpirationInstant::At)
        .ok_or_else(|| Error::InvalidAttribute {
            attribute: attributes::PWD_MAX_AGE.to_string(),
            value: max_age_seconds.to_string(),
        })
}

/// Combines the account's last password change with its policy's maximum age.
pub struct ExpirationCalculator<'a> {
    resolver: PasswordPolicyResolver,
    credentials: &'a ServiceCredentials,
}

impl<'a> ExpirationCalculator<'a> {
    /// Creates a calculator. Policy entries are read after binding as `credentials`.
    #[must_use]
    pub const fn new(
        resolver: PasswordPolicyResolver,
        credentials: &'a ServiceCredentials,
    ) -> Self {
        Self {
            resolver,
            credentials,
        }
    }

    /// Computes the expiration instant, propagating every failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeMissing`] without `pwdchangedtime`,
    /// [`Error::PolicyNotFound`] without a readable policy, or the directory failure.
    pub async fn try_expiration_date(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<ExpirationInstant> {
        let changed_at = self.password_changed_at(gateway, account).await?;
        let policy = self.resolver.effective_policy(gateway, account).await?;

        // Policy entries under cn=config are not readable by end users.
        gateway.bind_service(self.credentials).await?;
        let max_age = self.resolver.max_age(gateway, &policy).await?;

        compute_expiration(changed_at, max_age)
    }

    /// Computes the expiration instant, returning `None` when it cannot be determined.
    ///
    /// Failures are logged rather than returned.
    pub async fn expiration_date(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Option<ExpirationInstant> {
        match self.try_expiration_date(gateway, account).await {
            Ok(expiration) => Some(expiration),
            Err(err) => {
                log_unavailable(account, &err, "password expiration unavailable");
                None
            }
        }
    }

    async fn password_changed_at(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<DateTime<Utc>> {
        let entry = gateway
            .search(
                account.container(),
                SearchScope::Subtree,
                &account.uid_filter(),
                attributes::PWD_CHANGED_TIME,
            )
            .await?;

        let value = entry
            .as_ref()
            .and_then(|entry| entry.first(attributes::PWD_CHANGED_TIME))
            .ok_or_else(|| {
                Error::attribute_missing(attributes::PWD_CHANGED_TIME, account.to_string())
            })?;

        parse_generalized_time(value).ok_or_else(|| Error::InvalidAttribute {
            attribute: attributes::PWD_CHANGED_TIME.to_string(),
            value: value.to_string(),
        })
    }
}
