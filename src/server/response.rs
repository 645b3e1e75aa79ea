use http::StatusCode;
use serde_json::json;
use std::fmt;

/// A response cookie, emitted as one `Set-Cookie` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds
    pub max_age: Option<u64>,
    pub http_only: bool,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            http_only: false,
            secure: false,
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Cookie that clears `name` on the client
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(age) = self.max_age {
            write!(f, "; Max-Age={age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Response produced by the pipeline, before it is handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            cookies: Vec::new(),
            body: Vec::new(),
        }
    }

    /// `{"error": message}` with the given status
    pub fn json_error(status: StatusCode, message: impl fmt::Display) -> Self {
        let mut resp = Self::new(status);
        resp.set_header("Content-Type", "application/json; charset=utf-8");
        resp.body = json!({ "error": message.to_string() }).to_string().into_bytes();
        resp
    }

    /// Set `name`, replacing any header with the same name (case-insensitive)
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers including one `Set-Cookie` per cookie, in emission order
    pub fn wire_headers(&self) -> impl Iterator<Item = (&str, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .chain(self.cookies.iter().map(|c| ("Set-Cookie", c.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_value() {
        let c = Cookie::new("auth", "abc")
            .path("/")
            .max_age(3600)
            .http_only()
            .secure();
        assert_eq!(c.to_string(), "auth=abc; Path=/; Max-Age=3600; HttpOnly; Secure");
        assert_eq!(Cookie::expired("auth").to_string(), "auth=; Max-Age=0");
    }

    #[test]
    fn test_set_header_replaces() {
        let mut r = HttpResponse::default();
        r.set_header("Content-Type", "text/plain");
        r.set_header("content-type", "application/json");
        assert_eq!(r.headers.len(), 1);
        assert_eq!(r.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_json_error_body() {
        let r = HttpResponse::json_error(StatusCode::NOT_FOUND, "no route");
        let v: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
        assert_eq!(v["error"], "no route");
        assert_eq!(r.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_wire_headers_include_cookies() {
        let mut r = HttpResponse::default();
        r.set_header("X-A", "1");
        r.cookies.push(Cookie::new("s", "v"));
        let all: Vec<_> = r.wire_headers().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], ("Set-Cookie", "s=v".to_string()));
    }
}
