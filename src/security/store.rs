use crate::config::UserConfig;
use crate::principal::Principal;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// Failure reported by a [`CredentialStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The store does not implement this operation
    Unsupported(&'static str),
    /// The backing store could not answer
    Backend(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Unsupported(op) => {
                write!(f, "credential store does not support {op}")
            }
            CredentialError::Backend(msg) => write!(f, "credential store failure: {msg}"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// User lookup consulted during authentication.
///
/// The three lookups return `Ok(None)` for unknown or invalid credentials. Calls are
/// synchronous and made once per request from a worker coroutine, so implementations
/// should answer quickly and must be safe to call concurrently.
pub trait CredentialStore: Send + Sync {
    /// Principal for a session cookie value
    fn user_by_cookie(&self, cookie: &str) -> Result<Option<Principal>, CredentialError>;

    /// Principal for a user name and password
    fn user_by_login(&self, user: &str, password: &str)
        -> Result<Option<Principal>, CredentialError>;

    /// Principal for an access key
    fn user_by_key(&self, key: &str) -> Result<Option<Principal>, CredentialError>;

    /// Issue a session cookie value for a valid login
    fn cookie_by_login(&self, user: &str, password: &str) -> Result<Option<String>, CredentialError> {
        let _ = (user, password);
        Err(CredentialError::Unsupported("cookie_by_login"))
    }

    /// End the session identified by `cookie`
    fn logout_with_cookie(&self, cookie: &str) -> Result<(), CredentialError> {
        let _ = cookie;
        Err(CredentialError::Unsupported("logout_with_cookie"))
    }

    /// Persist changes to a user; `Ok(false)` when the user is unknown
    fn update_user(&self, principal: &Principal) -> Result<bool, CredentialError> {
        let _ = principal;
        Err(CredentialError::Unsupported("update_user"))
    }
}

/// Store that knows no users; every request runs as anonymous
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentialStore;

impl CredentialStore for NoCredentialStore {
    fn user_by_cookie(&self, _cookie: &str) -> Result<Option<Principal>, CredentialError> {
        Ok(None)
    }

    fn user_by_login(
        &self,
        _user: &str,
        _password: &str,
    ) -> Result<Option<Principal>, CredentialError> {
        Ok(None)
    }

    fn user_by_key(&self, _key: &str) -> Result<Option<Principal>, CredentialError> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct UserRecord {
    password: String,
    roles: BTreeSet<String>,
}

/// Process-local credential store.
///
/// Users are registered with a password and role set. Logins issue ULID session cookies;
/// access keys map to a user name.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, UserRecord>,
    sessions: DashMap<String, String>,
    keys: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user
    pub fn add_user<I, S>(&self, name: &str, password: &str, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            name.to_string(),
            UserRecord {
                password: password.to_string(),
                roles: roles.into_iter().map(Into::into).collect(),
            },
        );
    }

    /// Builder-style [`InMemoryCredentialStore::add_user`]
    #[must_use]
    pub fn with_user<I, S>(self, name: &str, password: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_user(name, password, roles);
        self
    }

    /// Store holding `users` and their access keys
    #[must_use]
    pub fn from_users(users: &[UserConfig]) -> Self {
        let store = Self::new();
        for user in users {
            store.add_user(&user.name, &user.password, user.roles.iter().cloned());
            for key in &user.keys {
                store.add_key(key, &user.name);
            }
        }
        store
    }

    /// Map an access key to an existing user name
    pub fn add_key(&self, key: &str, user: &str) {
        self.keys.insert(key.to_string(), user.to_string());
    }

    /// Number of open sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn principal_for(&self, user: &str) -> Option<Principal> {
        self.users
            .get(user)
            .map(|rec| Principal::authenticated(user, rec.roles.iter().cloned()))
    }

    fn check_login(&self, user: &str, password: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|rec| rec.password == password)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn user_by_cookie(&self, cookie: &str) -> Result<Option<Principal>, CredentialError> {
        let user = self.sessions.get(cookie).map(|u| u.value().clone());
        Ok(user.and_then(|u| self.principal_for(&u)))
    }

    fn user_by_login(
        &self,
        user: &str,
        password: &str,
    ) -> Result<Option<Principal>, CredentialError> {
        if self.check_login(user, password) {
            Ok(self.principal_for(user))
        } else {
            Ok(None)
        }
    }

    fn user_by_key(&self, key: &str) -> Result<Option<Principal>, CredentialError> {
        let user = self.keys.get(key).map(|u| u.value().clone());
        Ok(user.and_then(|u| self.principal_for(&u)))
    }

    fn cookie_by_login(&self, user: &str, password: &str) -> Result<Option<String>, CredentialError> {
        if !self.check_login(user, password) {
            debug!(user = %user, "login rejected");
            return Ok(None);
        }
        let cookie = ulid::Ulid::new().to_string();
        self.sessions.insert(cookie.clone(), user.to_string());
        info!(user = %user, sessions = self.sessions.len(), "session opened");
        Ok(Some(cookie))
    }

    fn logout_with_cookie(&self, cookie: &str) -> Result<(), CredentialError> {
        if let Some((_, user)) = self.sessions.remove(cookie) {
            info!(user = %user, "session closed");
        }
        Ok(())
    }

    fn update_user(&self, principal: &Principal) -> Result<bool, CredentialError> {
        match self.users.get_mut(principal.name()) {
            Some(mut rec) => {
                rec.roles = principal.roles().clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
