use super::{CredentialError, CredentialStore, SecurityProvider, SecurityRequest};
use crate::principal::Principal;
use base64::Engine;

/// HTTP Basic authentication.
///
/// Credentials come from `Authorization: Basic <base64(user:password)>` and are checked
/// with [`CredentialStore::user_by_login`]. A malformed header counts as no credentials.
#[derive(Debug, Clone)]
pub struct BasicProvider {
    realm: String,
}

impl BasicProvider {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

/// Decode an `Authorization` header value into `(user, password)`
#[must_use]
pub fn decode_basic_credentials(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

impl SecurityProvider for BasicProvider {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    fn authenticate(
        &self,
        req: &SecurityRequest<'_>,
        store: &dyn CredentialStore,
    ) -> Result<Option<Principal>, CredentialError> {
        match req
            .get_header("authorization")
            .and_then(decode_basic_credentials)
        {
            Some((user, password)) => store.user_by_login(&user, &password),
            None => Ok(None),
        }
    }

    fn challenge(&self) -> Option<String> {
        Some(format!("Basic realm=\"{}\"", self.realm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_credentials() {
        // "alice:s3cr:et"
        let header = "Basic YWxpY2U6czNjcjpldA==";
        assert_eq!(
            decode_basic_credentials(header),
            Some(("alice".to_string(), "s3cr:et".to_string()))
        );
        assert_eq!(decode_basic_credentials("Bearer abc"), None);
        assert_eq!(decode_basic_credentials("Basic !!!"), None);
        assert_eq!(decode_basic_credentials("Basic"), None);
    }

    #[test]
    fn test_challenge_names_realm() {
        let p = BasicProvider::new("ctlrouter");
        assert_eq!(p.challenge().as_deref(), Some("Basic realm=\"ctlrouter\""));
    }
}
