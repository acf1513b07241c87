//! In-memory directory used by the integration tests.
//!
//! Implements just enough of the server behaviour the account engines rely on: simple binds
//! checked against `userpassword`, base and subtree searches with `(uid=...)` and
//! `(objectclass=*)` filters, and modify result codes 16, 20, 32 and 50.

#![allow(dead_code)]

use async_trait::async_trait;
use dsee_account::{
    DirectoryConnector, DirectoryModification, DirectorySession, DistinguishedName, LdapEntry,
    ModifyOperation, SearchScope,
};
use dsee_core::error::{
    Error, Result, RESULT_CODE_NO_SUCH_ATTRIBUTE, RESULT_CODE_NO_SUCH_OBJECT,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ADMIN_DN: &str = "cn=Directory Manager";
pub const ADMIN_PASSWORD: &str = "password";
pub const PEOPLE: &str = "ou=people,dc=example,dc=com";
pub const GLOBAL_POLICY: &str = "cn=Password Policy,cn=config";

const RESULT_CODE_INSUFFICIENT_ACCESS: u32 = 50;
const RESULT_CODE_VALUE_EXISTS: u32 = 20;

#[derive(Default)]
struct State {
    entries: Vec<LdapEntry>,
    fail_searches: bool,
    connections: usize,
}

/// Shared directory contents; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<State>>,
}

fn normalize_dn(dn: &str) -> String {
    DistinguishedName::parse(dn)
        .map(|dn| dn.as_str().to_ascii_lowercase())
        .unwrap_or_else(|_| dn.to_ascii_lowercase())
}

fn unescape_filter_value(value: &str) -> String {
    value
        .replace("\\2a", "*")
        .replace("\\28", "(")
        .replace("\\29", ")")
        .replace("\\00", "\0")
        .replace("\\5c", "\\")
}

impl InMemoryDirectory {
    /// Directory seeded with the people container and a 90-day global policy.
    pub fn seeded() -> Self {
        let directory = Self::default();
        directory.add_entry("dc=example,dc=com", &[("objectclass", "domain")]);
        directory.add_entry(PEOPLE, &[("objectclass", "organizationalunit")]);
        directory.add_entry(
            GLOBAL_POLICY,
            &[("objectclass", "pwdPolicy"), ("pwdMaxAge", "7776000")],
        );
        directory
    }

    /// Adds a person entry under [`PEOPLE`].
    pub fn add_user(&self, uid: &str, password: &str, extra: &[(&str, &str)]) {
        let mut attributes = vec![
            ("objectclass", "person"),
            ("uid", uid),
            ("userpassword", password),
        ];
        attributes.extend_from_slice(extra);
        self.add_entry(&format!("uid={uid},{PEOPLE}"), &attributes);
    }

    pub fn add_entry(&self, dn: &str, attributes: &[(&str, &str)]) {
        let entry = attributes
            .iter()
            .fold(LdapEntry::new(dn), |entry, (name, value)| {
                entry.with_attribute(name.to_ascii_lowercase(), *value)
            });
        self.state.lock().unwrap().entries.push(entry);
    }

    /// Values of `attribute` on the entry at `dn`.
    pub fn values(&self, dn: &str, attribute: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .find(|entry| normalize_dn(&entry.dn) == normalize_dn(dn))
            .and_then(|entry| entry.values(attribute).map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    pub fn set_values(&self, dn: &str, attribute: &str, values: &[&str]) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|entry| normalize_dn(&entry.dn) == normalize_dn(dn))
        {
            let key = attribute.to_ascii_lowercase();
            if values.is_empty() {
                entry.attributes.remove(&key);
            } else {
                entry
                    .attributes
                    .insert(key, values.iter().map(ToString::to_string).collect());
            }
        }
    }

    pub fn fail_searches(&self, fail: bool) {
        self.state.lock().unwrap().fail_searches = fail;
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    pub fn connector(&self) -> InMemoryConnector {
        InMemoryConnector {
            directory: self.clone(),
        }
    }
}

pub struct InMemoryConnector {
    directory: InMemoryDirectory,
}

#[async_trait]
impl DirectoryConnector for InMemoryConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>> {
        self.directory.state.lock().unwrap().connections += 1;
        Ok(Box::new(InMemorySession {
            directory: self.directory.clone(),
            bound_as: None,
        }))
    }
}

struct InMemorySession {
    directory: InMemoryDirectory,
    bound_as: Option<String>,
}

impl InMemorySession {
    fn is_admin(&self) -> bool {
        self.bound_as.as_deref() == Some(ADMIN_DN)
    }
}

#[async_trait]
impl DirectorySession for InMemorySession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        if dn == ADMIN_DN && password == ADMIN_PASSWORD {
            self.bound_as = Some(ADMIN_DN.to_string());
            return Ok(());
        }

        let matches = self
            .directory
            .values(dn, "userpassword")
            .iter()
            .any(|value| value == password);
        if matches {
            self.bound_as = Some(normalize_dn(dn));
            Ok(())
        } else {
            self.bound_as = None;
            Err(Error::BindFailure(dn.to_string()))
        }
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let state = self.directory.state.lock().unwrap();
        if state.fail_searches {
            return Err(Error::SearchFailure("server unavailable".to_string()));
        }

        let base = normalize_dn(base_dn);
        let uid = filter
            .strip_prefix("(uid=")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(unescape_filter_value);
        assert!(
            uid.is_some() || filter.eq_ignore_ascii_case("(objectclass=*)"),
            "unsupported filter {filter}"
        );

        Ok(state
            .entries
            .iter()
            .filter(|entry| {
                let dn = normalize_dn(&entry.dn);
                match scope {
                    SearchScope::Base => dn == base,
                    SearchScope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
                }
            })
            .filter(|entry| match &uid {
                Some(uid) => entry
                    .values("uid")
                    .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case(uid))),
                None => true,
            })
            .map(|entry| {
                let projected: HashMap<String, Vec<String>> = attributes
                    .iter()
                    .filter_map(|name| {
                        entry
                            .values(name)
                            .map(|values| ((*name).to_string(), values.to_vec()))
                    })
                    .collect();
                LdapEntry {
                    dn: entry.dn.clone(),
                    attributes: projected,
                }
            })
            .collect())
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        if !self.is_admin() {
            return Err(Error::DirectoryError {
                result_code: RESULT_CODE_INSUFFICIENT_ACCESS,
                message: "insufficient access rights".to_string(),
            });
        }

        let mut state = self.directory.state.lock().unwrap();
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| normalize_dn(&entry.dn) == normalize_dn(dn))
            .ok_or_else(|| Error::DirectoryError {
                result_code: RESULT_CODE_NO_SUCH_OBJECT,
                message: format!("no such object {dn}"),
            })?;

        let mut attributes = entry.attributes.clone();
        for modification in modifications {
            apply(&mut attributes, modification)?;
        }
        entry.attributes = attributes;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.bound_as = None;
        Ok(())
    }
}

fn apply(
    attributes: &mut HashMap<String, Vec<String>>,
    modification: &DirectoryModification,
) -> Result<()> {
    let no_such_attribute = |attribute: &str| Error::DirectoryError {
        result_code: RESULT_CODE_NO_SUCH_ATTRIBUTE,
        message: format!("no such attribute {attribute}"),
    };

    let DirectoryModification {
        operation,
        attribute,
        values,
    } = modification;
    match operation {
        ModifyOperation::Add => {
            let current = attributes.entry(attribute.to_ascii_lowercase()).or_default();
            if values.iter().any(|value| current.contains(value)) {
                return Err(Error::DirectoryError {
                    result_code: RESULT_CODE_VALUE_EXISTS,
                    message: format!("value exists for {attribute}"),
                });
            }
            current.extend(values.iter().cloned());
        }
        ModifyOperation::Delete => {
            let key = attribute.to_ascii_lowercase();
            let current = attributes
                .get_mut(&key)
                .ok_or_else(|| no_such_attribute(attribute))?;
            if values.is_empty() {
                attributes.remove(&key);
            } else {
                for value in values {
                    let position = current
                        .iter()
                        .position(|existing| existing.eq_ignore_ascii_case(value))
                        .ok_or_else(|| no_such_attribute(attribute))?;
                    current.remove(position);
                }
                if current.is_empty() {
                    attributes.remove(&key);
                }
            }
        }
        ModifyOperation::Replace => {
            let key = attribute.to_ascii_lowercase();
            if values.is_empty() {
                attributes.remove(&key);
            } else {
                attributes.insert(key, values.clone());
            }
        }
    }
    Ok(())
}
