//! # Security Module
//!
//! Authentication for ctlrouter. Every request is turned into a [`Principal`] before it is
//! routed; authorization happens later, per route, by comparing the principal's roles with
//! the route's required role.
//!
//! ## Overview
//!
//! - A [`CredentialStore`] is the user database: it answers cookie, login and key lookups.
//! - A [`SecurityProvider`] extracts credentials for one scheme from the request and asks
//!   the store about them. Providers exist for the four schemes of [`AuthScheme`]: `none`,
//!   `cookie` (named cookie, default `auth`), `basic` (HTTP Basic) and `key` (named header,
//!   default `key`).
//! - The [`Authenticator`] owns the server-wide provider and store and applies the
//!   fallback rules.
//!
//! ## Fallback
//!
//! Authentication never fails a request. Missing credentials, unknown credentials and store
//! errors all produce the anonymous principal (`{"Anonymous"}`, not authenticated). An
//! unauthenticated principal is renamed to the remote peer address so log lines can be
//! correlated; the name grants nothing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ctlrouter::security::{AuthScheme, Authenticator, InMemoryCredentialStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryCredentialStore::new().with_user("alice", "pw", ["Admin"]));
//! let auth = Authenticator::new(&AuthScheme::basic(), store);
//! let principal = auth.authenticate(&raw_request);
//! ```

use crate::principal::Principal;
use crate::server::{HeaderVec, RawRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

mod basic;
mod cookie;
mod key;
mod store;

pub use basic::{decode_basic_credentials, BasicProvider};
pub use cookie::CookieProvider;
pub use key::KeyProvider;
pub use store::{CredentialError, CredentialStore, InMemoryCredentialStore, NoCredentialStore};

/// Default cookie name of the cookie scheme
pub const DEFAULT_COOKIE_NAME: &str = "auth";
/// Default header name of the key scheme
pub const DEFAULT_KEY_HEADER: &str = "key";
/// Default realm of the basic scheme
pub const DEFAULT_REALM: &str = "ctlrouter";

/// Credentials view of a request handed to a [`SecurityProvider`]
pub struct SecurityRequest<'a> {
    /// Request headers, lowercase names
    pub headers: &'a HeaderVec,
    /// Cookies from the `Cookie` header
    pub cookies: &'a HashMap<String, String>,
}

impl<'a> SecurityRequest<'a> {
    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a cookie by name
    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// One authentication scheme.
///
/// Implementations extract their credentials from the request and consult the store.
/// `Ok(None)` means "no usable credentials"; the authenticator falls back to anonymous.
pub trait SecurityProvider: Send + Sync {
    /// Scheme name used in logs
    fn scheme(&self) -> &'static str;

    /// Resolve the request's credentials to a principal
    fn authenticate(
        &self,
        req: &SecurityRequest<'_>,
        store: &dyn CredentialStore,
    ) -> Result<Option<Principal>, CredentialError>;

    /// `WWW-Authenticate` value sent with `401` responses, if the scheme has one
    fn challenge(&self) -> Option<String> {
        None
    }
}

/// Provider for the `none` scheme; never consults the store
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthProvider;

impl SecurityProvider for NoAuthProvider {
    fn scheme(&self) -> &'static str {
        "none"
    }

    fn authenticate(
        &self,
        _req: &SecurityRequest<'_>,
        _store: &dyn CredentialStore,
    ) -> Result<Option<Principal>, CredentialError> {
        Ok(None)
    }
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_key_header() -> String {
    DEFAULT_KEY_HEADER.to_string()
}

fn default_realm() -> String {
    DEFAULT_REALM.to_string()
}

/// Server-wide authentication scheme, as written in configuration files:
///
/// ```yaml
/// auth:
///   scheme: cookie
///   name: session
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    None,
    Cookie {
        #[serde(default = "default_cookie_name")]
        name: String,
    },
    Basic {
        #[serde(default = "default_realm")]
        realm: String,
    },
    Key {
        #[serde(default = "default_key_header")]
        header: String,
    },
}

impl AuthScheme {
    #[must_use]
    pub fn cookie() -> Self {
        AuthScheme::Cookie {
            name: default_cookie_name(),
        }
    }

    #[must_use]
    pub fn basic() -> Self {
        AuthScheme::Basic {
            realm: default_realm(),
        }
    }

    #[must_use]
    pub fn key() -> Self {
        AuthScheme::Key {
            header: default_key_header(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AuthScheme::None => "none",
            AuthScheme::Cookie { .. } => "cookie",
            AuthScheme::Basic { .. } => "basic",
            AuthScheme::Key { .. } => "key",
        }
    }

    /// Build the provider for this scheme
    #[must_use]
    pub fn provider(&self) -> Box<dyn SecurityProvider> {
        match self {
            AuthScheme::None => Box::new(NoAuthProvider),
            AuthScheme::Cookie { name } => Box::new(CookieProvider::new(name.clone())),
            AuthScheme::Basic { realm } => Box::new(BasicProvider::new(realm.clone())),
            AuthScheme::Key { header } => Box::new(KeyProvider::new(header.clone())),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    /// Parse a scheme name, using the default cookie/header/realm names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(AuthScheme::None),
            "cookie" => Ok(AuthScheme::cookie()),
            "basic" => Ok(AuthScheme::basic()),
            "key" => Ok(AuthScheme::key()),
            other => Err(format!(
                "unknown auth scheme '{other}' (expected none, cookie, basic or key)"
            )),
        }
    }
}

/// Resolves the principal of each request with one provider and one store
pub struct Authenticator {
    provider: Box<dyn SecurityProvider>,
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(scheme: &AuthScheme, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_provider(scheme.provider(), store)
    }

    /// Use a custom provider instead of one of the built-in schemes
    pub fn with_provider(provider: Box<dyn SecurityProvider>, store: Arc<dyn CredentialStore>) -> Self {
        Self { provider, store }
    }

    #[must_use]
    pub fn scheme(&self) -> &'static str {
        self.provider.scheme()
    }

    /// `WWW-Authenticate` value for `401` responses
    #[must_use]
    pub fn challenge(&self) -> Option<String> {
        self.provider.challenge()
    }

    /// Resolve the principal for `raw`; never fails.
    pub fn authenticate(&self, raw: &RawRequest) -> Principal {
        let cookies = raw.cookies();
        let req = SecurityRequest {
            headers: &raw.headers,
            cookies: &cookies,
        };

        let resolved = match self.provider.authenticate(&req, self.store.as_ref()) {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    scheme = self.provider.scheme(),
                    error = %e,
                    "credential lookup failed; continuing as anonymous"
                );
                None
            }
        };

        let mut principal = resolved.unwrap_or_else(Principal::anonymous);
        if !principal.is_authenticated() {
            principal.set_name(raw.peer());
        }

        debug!(
            scheme = self.provider.scheme(),
            principal = %principal.name(),
            authenticated = principal.is_authenticated(),
            roles = ?principal.roles(),
            "principal resolved"
        );
        principal
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("scheme", &self.provider.scheme())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::ANONYMOUS_ROLE;
    use std::net::SocketAddr;

    fn peer() -> SocketAddr {
        "10.0.0.7:5555".parse().unwrap()
    }

    #[test]
    fn test_scheme_config_defaults() {
        let s: AuthScheme = serde_json::from_str(r#"{"scheme":"cookie"}"#).unwrap();
        assert_eq!(s, AuthScheme::cookie());
        let s: AuthScheme = serde_json::from_str(r#"{"scheme":"key","header":"x-key"}"#).unwrap();
        assert_eq!(
            s,
            AuthScheme::Key {
                header: "x-key".into()
            }
        );
        let s: AuthScheme = serde_json::from_str(r#"{"scheme":"none"}"#).unwrap();
        assert_eq!(s, AuthScheme::None);
        assert_eq!("BASIC".parse::<AuthScheme>().unwrap(), AuthScheme::basic());
        assert!("digest".parse::<AuthScheme>().is_err());
    }

    #[test]
    fn test_anonymous_fallback_takes_peer_name() {
        let store = Arc::new(InMemoryCredentialStore::new().with_user("alice", "pw", ["Admin"]));
        let auth = Authenticator::new(&AuthScheme::key(), store);
        let raw = RawRequest::new("GET", "/").with_remote_addr(peer());
        let p = auth.authenticate(&raw);
        assert!(!p.is_authenticated());
        assert!(p.has_role(ANONYMOUS_ROLE));
        assert_eq!(p.name(), "10.0.0.7:5555");
    }

    #[test]
    fn test_key_scheme_resolves_user() {
        let store = InMemoryCredentialStore::new().with_user("alice", "pw", ["Admin"]);
        store.add_key("secret", "alice");
        let auth = Authenticator::new(&AuthScheme::key(), Arc::new(store));
        let raw = RawRequest::new("GET", "/")
            .with_header("Key", "secret")
            .with_remote_addr(peer());
        let p = auth.authenticate(&raw);
        assert_eq!(p.name(), "alice");
        assert!(p.has_role("Admin"));
    }

    #[test]
    fn test_store_failure_degrades_to_anonymous() {
        let auth = Authenticator::new(&AuthScheme::cookie(), Arc::new(FailingStore));
        let raw = RawRequest::new("GET", "/").with_header("Cookie", "auth=abc");
        let p = auth.authenticate(&raw);
        assert!(!p.is_authenticated());
        assert_eq!(p.name(), "");
    }

    #[test]
    fn test_none_scheme_never_consults_store() {
        let auth = Authenticator::new(&AuthScheme::None, Arc::new(FailingStore));
        let raw = RawRequest::new("GET", "/")
            .with_header("Cookie", "auth=abc")
            .with_header("key", "k");
        assert!(!auth.authenticate(&raw).is_authenticated());
        assert_eq!(auth.challenge(), None);
    }

    struct FailingStore;

    impl CredentialStore for FailingStore {
        fn user_by_cookie(&self, _: &str) -> Result<Option<Principal>, CredentialError> {
            Err(CredentialError::Backend("down".into()))
        }
        fn user_by_login(&self, _: &str, _: &str) -> Result<Option<Principal>, CredentialError> {
            Err(CredentialError::Backend("down".into()))
        }
        fn user_by_key(&self, _: &str) -> Result<Option<Principal>, CredentialError> {
            Err(CredentialError::Backend("down".into()))
        }
    }
}
