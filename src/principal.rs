//! # Principal Module
//!
//! A [`Principal`] is the identity the current request runs as. It is resolved once per
//! request by the [`Authenticator`](crate::security::Authenticator) and handed to the
//! resolver (role check) and to handler code through the
//! [`HandlerContext`](crate::context::HandlerContext).
//!
//! When no credentials are presented, or the credential store rejects them, the request
//! runs as the anonymous principal: role set `{"Anonymous"}`, `authenticated = false`, and
//! its name replaced with the remote peer address for log correlation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role carried by the anonymous principal and required by routes that declare no role.
pub const ANONYMOUS_ROLE: &str = "Anonymous";

/// Identity and role set of the caller.
///
/// Role membership is literal: an authenticated principal only passes a route gated on
/// `"Anonymous"` if its role set contains `"Anonymous"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    roles: BTreeSet<String>,
    authenticated: bool,
}

impl Principal {
    /// Create a principal with an explicit role set and authentication flag
    pub fn new<I, S>(name: impl Into<String>, roles: I, authenticated: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authenticated,
        }
    }

    /// Create an authenticated principal, as returned by a credential store lookup
    pub fn authenticated<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, roles, true)
    }

    /// The fallback principal: empty name, `{"Anonymous"}`, not authenticated
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("", [ANONYMOUS_ROLE], false)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Check membership of `role` (exact, case-sensitive match)
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_principal() {
        let p = Principal::anonymous();
        assert_eq!(p.name(), "");
        assert!(!p.is_authenticated());
        assert!(p.has_role(ANONYMOUS_ROLE));
        assert_eq!(p.roles().len(), 1);
    }

    #[test]
    fn test_role_membership_is_exact() {
        let p = Principal::authenticated("alice", ["Admin", "User"]);
        assert!(p.is_authenticated());
        assert!(p.has_role("Admin"));
        assert!(!p.has_role("admin"));
        assert!(!p.has_role(ANONYMOUS_ROLE));
    }

    #[test]
    fn test_duplicate_roles_collapse() {
        let p = Principal::new("bob", ["User", "User"], true);
        assert_eq!(p.roles().len(), 1);
    }
}
