//! Accounts and password authentication.
//!
//! Credentials never leave this module: [`UserProfile`] carries only the
//! non-credential fields that end up in an assertion.

use std::collections::BTreeMap;
use std::fmt;

use idp_crypto::constant_time_eq;
use serde::{Deserialize, Serialize};

/// Account fields that must never be asserted: the login identifier under
/// either spelling, and the password.
const CREDENTIAL_FIELDS: [&str; 3] = ["name", "user", "password"];

/// A configured user account.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Login name.
    pub name: String,
    /// Plain-text password as configured.
    pub password: String,
    /// Email address; used as the NameID when present.
    #[serde(default)]
    pub email: Option<String>,
    /// Human-readable name, asserted as `displayName`.
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    /// Extra attributes asserted verbatim (for example `grafana_role`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Account {
    /// Creates an account with no optional fields.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            email: None,
            display_name: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adds an extra attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builds the identity asserted for this account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        let mut attributes: BTreeMap<String, String> = self
            .attributes
            .iter()
            .filter(|(k, _)| !CREDENTIAL_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(display_name) = &self.display_name {
            attributes.insert("displayName".to_string(), display_name.clone());
        }
        if let Some(email) = &self.email {
            attributes.insert("email".to_string(), email.clone());
        }

        UserProfile {
            username: self.name.clone(),
            email: self.email.clone(),
            attributes: attributes.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// An authenticated identity, stripped of credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Login name.
    pub username: String,
    /// Email address, if known.
    pub email: Option<String>,
    /// Asserted attributes, sorted by name.
    pub attributes: Vec<(String, String)>,
}

impl UserProfile {
    /// Creates a profile with no attributes.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            attributes: Vec::new(),
        }
    }

    /// The value used as the subject NameID: the email when present,
    /// otherwise the username.
    #[must_use]
    pub fn name_id(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.username)
    }
}

/// Password authentication.
pub trait Authenticator: Send + Sync {
    /// Returns the profile for `username` if `password` matches.
    fn authenticate(&self, username: &str, password: &str) -> Option<UserProfile>;

    /// Returns whether the credentials are valid.
    fn validate(&self, username: &str, password: &str) -> bool {
        self.authenticate(username, password).is_some()
    }
}

/// [`Authenticator`] over a fixed list of configured accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountList {
    accounts: Vec<Account>,
}

impl AccountList {
    /// Wraps the given accounts.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Number of configured accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns whether no accounts are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Authenticator for AccountList {
    fn authenticate(&self, username: &str, password: &str) -> Option<UserProfile> {
        // Every account is compared so timing does not reveal which name matched.
        let mut matched = None;
        for account in &self.accounts {
            let name_ok = constant_time_eq(account.name.as_bytes(), username.as_bytes());
            let password_ok = constant_time_eq(account.password.as_bytes(), password.as_bytes());
            if name_ok && password_ok && matched.is_none() {
                matched = Some(account);
            }
        }

        match matched {
            Some(account) => Some(account.profile()),
            None => {
                tracing::debug!(username, "credential check failed");
                None
            }
        }
    }
}
