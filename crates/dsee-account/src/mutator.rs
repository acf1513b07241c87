//! Account modifications: password rotation, activation, deactivation and max-age overrides.

use crate::{
    account::AccountId,
    attributes,
    dn::DistinguishedName,
    gateway::DirectoryGateway,
    session::DirectoryModification,
    Result,
};
use dsee_core::{Error, ServiceCredentials};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

/// Per-user `pwdMaxAge` written to force rotation within 90 days.
pub const FORCED_ROTATION_MAX_AGE_SECS: u64 = 7_776_000;

/// One modification of a sequence.
struct Step {
    change: DirectoryModification,
    /// Deleting an already-absent value counts as success.
    absent_ok: bool,
}

impl Step {
    const fn strict(change: DirectoryModification) -> Self {
        Self {
            change,
            absent_ok: false,
        }
    }

    const fn allow_absent(change: DirectoryModification) -> Self {
        Self {
            change,
            absent_ok: true,
        }
    }
}

/// Issues modification sequences against an account entry.
///
/// Each step binds as the service identity and then sends one modify request. There is no
/// transaction: when a later step fails the earlier ones stay applied, and the failing step's
/// error is returned as is.
pub struct AccountMutator<'a> {
    credentials: &'a ServiceCredentials,
}

impl<'a> AccountMutator<'a> {
    /// Creates a mutator that binds as `credentials` before every modify.
    #[must_use]
    pub const fn new(credentials: &'a ServiceCredentials) -> Self {
        Self { credentials }
    }

    /// Replaces `userpassword`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for an empty password, or the directory failure.
    pub async fn rotate_password(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
        new_password: &SecretString,
    ) -> Result<()> {
        if new_password.expose_secret().is_empty() {
            return Err(Error::ValidationError(
                "new password cannot be empty".to_string(),
            ));
        }

        self.apply(
            gateway,
            &account.dn(),
            vec![Step::strict(DirectoryModification::replace(
                attributes::USER_PASSWORD,
                new_password.expose_secret(),
            ))],
        )
        .await
    }

    /// Adds the disabled-role reference, then the `nsaccountlock` flag.
    ///
    /// The role goes first so the flag is never observed without it.
    ///
    /// # Errors
    ///
    /// Returns the directory failure of the first step that failed.
    pub async fn deactivate(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<()> {
        self.apply(
            gateway,
            &account.dn(),
            vec![
                Step::strict(DirectoryModification::add(
                    attributes::ROLE_DN,
                    account.disabled_role_dn().as_str(),
                )),
                Step::strict(DirectoryModification::add(
                    attributes::ACCOUNT_LOCK,
                    attributes::ACCOUNT_LOCK_VALUE,
                )),
            ],
        )
        .await
    }

    /// Removes the `nsaccountlock` flag, then the whole `nsroledn` attribute.
    ///
    /// Attributes that are already absent are skipped, so activating an active account
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the directory failure of the first step that failed.
    pub async fn activate(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<()> {
        self.apply(
            gateway,
            &account.dn(),
            vec![
                Step::allow_absent(DirectoryModification::delete_all(attributes::ACCOUNT_LOCK)),
                Step::allow_absent(DirectoryModification::delete_all(attributes::ROLE_DN)),
            ],
        )
        .await
    }

    /// Writes a per-user `pwdMaxAge` override.
    ///
    /// # Errors
    ///
    /// Returns the directory failure.
    pub async fn set_max_age(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
        seconds: u64,
    ) -> Result<()> {
        self.apply(
            gateway,
            &account.dn(),
            vec![Step::strict(DirectoryModification::replace(
                attributes::PWD_MAX_AGE,
                seconds.to_string(),
            ))],
        )
        .await
    }

    /// Writes the 90-day override used to force a password rotation.
    ///
    /// # Errors
    ///
    /// Returns the directory failure.
    pub async fn force_rotation_window(
        &self,
        gateway: &mut DirectoryGateway,
        account: &AccountId,
    ) -> Result<()> {
        self.set_max_age(gateway, account, FORCED_ROTATION_MAX_AGE_SECS)
            .await
    }

    async fn apply(
        &self,
        gateway: &mut DirectoryGateway,
        dn: &DistinguishedName,
        steps: Vec<Step>,
    ) -> Result<()> {
        let total = steps.len();
        for (applied, step) in steps.into_iter().enumerate() {
            let attribute = step.change.attribute.clone();
            let outcome = match gateway.bind_service(self.credentials).await {
                Ok(()) => gateway.modify(dn, step.change).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => {}
                Err(err) if step.absent_ok && err.is_no_such_attribute() => {
                    debug!(dn = %dn, attribute = %attribute, "value already absent");
                }
                Err(err) => {
                    if applied > 0 {
                        error!(
                            dn = %dn,
                            attribute = %attribute,
                            applied,
                            total,
                            error = %err,
                            "modification sequence partially applied"
                        );
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}
