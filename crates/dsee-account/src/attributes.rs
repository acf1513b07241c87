//! Attribute names and well-known values of the directory schema.
//!
//! Names must match the server schema verbatim.

/// Maximum password age in seconds, on a policy entry or as a per-user override.
pub const PWD_MAX_AGE: &str = "pwdMaxAge";

/// Role memberships of an entry.
pub const ROLE_DN: &str = "nsroledn";

/// Administrative deactivation flag.
pub const ACCOUNT_LOCK: &str = "nsaccountlock";

/// Set by the server while an account is locked out after failed binds.
pub const ACCOUNT_UNLOCK_TIME: &str = "accountunlocktime";

/// Generalized time of the last password change.
pub const PWD_CHANGED_TIME: &str = "pwdchangedtime";

/// Reference to the password policy entry governing the account.
pub const PASSWORD_POLICY_SUBENTRY: &str = "passwordpolicysubentry";

/// User password.
pub const USER_PASSWORD: &str = "userpassword";

/// Naming attribute of account entries.
pub const UID: &str = "uid";

/// Common name of the managed role that disables accounts in a container.
pub const DISABLED_ROLE_CN: &str = "nsManagedDisabledRole";

/// Value written to [`ACCOUNT_LOCK`] on deactivation.
pub const ACCOUNT_LOCK_VALUE: &str = "true";

/// Filter matching any entry, used for base-scope reads.
pub const ANY_OBJECT_FILTER: &str = "(objectclass=*)";
