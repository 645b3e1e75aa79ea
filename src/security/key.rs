use super::{CredentialError, CredentialStore, SecurityProvider, SecurityRequest};
use crate::principal::Principal;

/// Access key authentication: the value of a named request header is looked up with
/// [`CredentialStore::user_by_key`]
#[derive(Debug, Clone)]
pub struct KeyProvider {
    header: String,
}

impl KeyProvider {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header
    }
}

impl SecurityProvider for KeyProvider {
    fn scheme(&self) -> &'static str {
        "key"
    }

    fn authenticate(
        &self,
        req: &SecurityRequest<'_>,
        store: &dyn CredentialStore,
    ) -> Result<Option<Principal>, CredentialError> {
        match req.get_header(&self.header).map(str::trim) {
            Some(key) if !key.is_empty() => store.user_by_key(key),
            _ => Ok(None),
        }
    }
}
