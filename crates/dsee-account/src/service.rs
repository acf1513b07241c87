//! Account lifecycle facade.

use crate::{
    account::{log_unavailable, AccountId},
    config::DirectoryConfig,
    expiration::{ExpirationCalculator, ExpirationInstant},
    gateway::DirectoryGateway,
    mutator::AccountMutator,
    policy::PasswordPolicyResolver,
    session::{DirectoryConnector, LdapDirectoryConnector},
    status::{AccountStatus, AccountStatusEngine},
    Result,
};
use chrono::{DateTime, Utc};
use dsee_core::Error;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs account operations, each on its own directory connection.
///
/// No bind state outlives a call, so the service can be shared between tasks.
pub struct AccountService {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn DirectoryConnector>,
}

impl AccountService {
    /// Creates a service that uses the `ldap3` connector.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn DirectoryConnector> =
            Box::new(LdapDirectoryConnector::new(config.clone()));
        Self { config, connector }
    }

    /// Creates a service with a custom connector.
    #[must_use]
    pub fn with_connector(config: DirectoryConfig, connector: Box<dyn DirectoryConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Opens an unbound connection for composing engine calls by hand.
    ///
    /// # Errors
    ///
    /// Returns the connection failure.
    pub async fn open_gateway(&self) -> Result<DirectoryGateway> {
        self.connector
            .connect()
            .await
            .map(DirectoryGateway::new)
    }

    /// Opens a connection bound as `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindFailure`] when the credential is rejected, or the connection
    /// failure.
    pub async fn connect_as(&self, dn: &str, credential: &str) -> Result<DirectoryGateway> {
        let mut gateway = self.open_gateway().await?;
        match gateway.bind(dn, credential).await {
            Ok(true) => Ok(gateway),
            Ok(false) => release(gateway, Err(Error::BindFailure(dn.to_string()))).await,
            Err(err) => release(gateway, Err(err)).await,
        }
    }

    /// Checks a username and password by binding as `uid=<username>,<people container>`.
    ///
    /// Never fails: rejected credentials and unreachable directories both yield `false`.
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        // An empty password would be an anonymous bind, which servers accept.
        if password.is_empty() {
            debug!(username, "empty password rejected");
            return false;
        }

        let account = match AccountId::new(username, self.config.people_container().clone()) {
            Ok(account) => account,
            Err(err) => {
                debug!(error = %err, "invalid username");
                return false;
            }
        };

        let mut gateway = match self.open_gateway().await {
            Ok(gateway) => gateway,
            Err(err) => {
                warn!(username, error = %err, "authentication skipped, directory unreachable");
                return false;
            }
        };

        let result = gateway.bind(account.dn().as_str(), password).await;
        match release(gateway, result).await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                warn!(username, error = %err, "authentication failed");
                false
            }
        }
    }

    /// Current status of the account, or `None` when the directory could not be read.
    pub async fn account_status(&self, account: &AccountId) -> Option<AccountStatus> {
        let result = match self.service_gateway().await {
            Ok(mut gateway) => {
                let status = AccountStatusEngine::new()
                    .status(&mut gateway, account)
                    .await;
                release(gateway, status).await
            }
            Err(err) => Err(err),
        };

        result
            .map_err(|err| log_unavailable(account, &err, "account status unavailable"))
            .ok()
    }

    /// Password expiration of the account, or `None` when it cannot be determined.
    pub async fn expiration_date(&self, account: &AccountId) -> Option<ExpirationInstant> {
        let mut gateway = match self.service_gateway().await {
            Ok(gateway) => gateway,
            Err(err) => {
                log_unavailable(account, &err, "password expiration unavailable");
                return None;
            }
        };

        let expiration = self
            .calculator()
            .expiration_date(&mut gateway, account)
            .await;
        release(gateway, Ok(expiration)).await.ok().flatten()
    }

    /// Whether the password is past its expiration at `now`, or `None` when unknown.
    pub async fn is_password_expired(
        &self,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Option<bool> {
        self.expiration_date(account)
            .await
            .map(|expiration| expiration.has_expired_at(now))
    }

    /// Replaces the account password.
    ///
    /// # Errors
    ///
    /// Returns the failure of the connection or the modification.
    pub async fn rotate_password(
        &self,
        account: &AccountId,
        new_password: &SecretString,
    ) -> Result<()> {
        let mut gateway = self.open_gateway().await?;
        let result = self
            .mutator()
            .rotate_password(&mut gateway, account, new_password)
            .await;
        release(gateway, result).await
    }

    /// Deactivates the account.
    ///
    /// # Errors
    ///
    /// Returns the failure of the connection or of the first failing modification.
    pub async fn deactivate(&self, account: &AccountId) -> Result<()> {
        let mut gateway = self.open_gateway().await?;
        let result = self.mutator().deactivate(&mut gateway, account).await;
        release(gateway, result).await
    }

    /// Activates the account. Activating an active account is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the failure of the connection or of the first failing modification.
    pub async fn activate(&self, account: &AccountId) -> Result<()> {
        let mut gateway = self.open_gateway().await?;
        let result = self.mutator().activate(&mut gateway, account).await;
        release(gateway, result).await
    }

    /// Writes a per-user `pwdMaxAge` override.
    ///
    /// # Errors
    ///
    /// Returns the failure of the connection or the modification.
    pub async fn set_max_age(&self, account: &AccountId, seconds: u64) -> Result<()> {
        let mut gateway = self.open_gateway().await?;
        let result = self
            .mutator()
            .set_max_age(&mut gateway, account, seconds)
            .await;
        release(gateway, result).await
    }

    /// Writes the 90-day `pwdMaxAge` override.
    ///
    /// # Errors
    ///
    /// Returns the failure of the connection or the modification.
    pub async fn force_rotation_window(&self, account: &AccountId) -> Result<()> {
        let mut gateway = self.open_gateway().await?;
        let result = self
            .mutator()
            .force_rotation_window(&mut gateway, account)
            .await;
        release(gateway, result).await
    }

    // Operational attributes are usually hidden from anonymous reads.
    async fn service_gateway(&self) -> Result<DirectoryGateway> {
        let mut gateway = self.open_gateway().await?;
        match gateway.bind_service(self.config.service()).await {
            Ok(()) => Ok(gateway),
            Err(err) => release(gateway, Err(err)).await,
        }
    }

    fn calculator(&self) -> ExpirationCalculator<'_> {
        ExpirationCalculator::new(
            PasswordPolicyResolver::new(self.config.default_policy_dn().clone()),
            self.config.service(),
        )
    }

    fn mutator(&self) -> AccountMutator<'_> {
        AccountMutator::new(self.config.service())
    }
}

async fn release<T>(gateway: DirectoryGateway, result: Result<T>) -> Result<T> {
    if let Err(err) = gateway.close().await {
        debug!(error = %err, "unbind failed");
    }
    result
}
