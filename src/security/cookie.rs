use super::{CredentialError, CredentialStore, SecurityProvider, SecurityRequest};
use crate::principal::Principal;

/// Session cookie authentication: looks the named cookie up with
/// [`CredentialStore::user_by_cookie`]
#[derive(Debug, Clone)]
pub struct CookieProvider {
    name: String,
}

impl CookieProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.name
    }
}

impl SecurityProvider for CookieProvider {
    fn scheme(&self) -> &'static str {
        "cookie"
    }

    fn authenticate(
        &self,
        req: &SecurityRequest<'_>,
        store: &dyn CredentialStore,
    ) -> Result<Option<Principal>, CredentialError> {
        match req.get_cookie(&self.name) {
            Some(value) if !value.is_empty() => store.user_by_cookie(value),
            _ => Ok(None),
        }
    }
}
