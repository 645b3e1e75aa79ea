use crate::router::RouteRegistry;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::debug;

/// Maximum number of headers kept inline before spilling to the heap
pub const MAX_INLINE_HEADERS: usize = 16;
/// Maximum number of query parameters kept inline before spilling to the heap
pub const MAX_INLINE_QUERY: usize = 8;

/// Request headers as `(lowercase name, value)` pairs
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;
/// Query parameters in order of first appearance
pub type QueryVec = SmallVec<[(String, String); MAX_INLINE_QUERY]>;

/// Transport-independent view of an incoming request.
///
/// The listener fills one of these per connection; everything after it (authentication,
/// parsing, dispatch) works on this type only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// Verb as sent by the client
    pub method: String,
    /// Request target: path plus optional `?query`
    pub url: String,
    /// Header names are stored lowercase
    pub headers: HeaderVec,
    pub remote_addr: Option<SocketAddr>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// First header named `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path component of the request target
    #[must_use]
    pub fn path(&self) -> &str {
        match self.url.split_once('?') {
            Some((path, _)) => path,
            None => &self.url,
        }
    }

    /// Raw query string, without the leading `?`
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Cookies sent in the `Cookie` header
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        self.header("cookie").map(parse_cookies).unwrap_or_default()
    }

    /// Remote peer as text, empty when the transport did not provide one
    #[must_use]
    pub fn peer(&self) -> String {
        self.remote_addr.map(|a| a.to_string()).unwrap_or_default()
    }
}

/// Routing facts extracted from a [`RawRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Registry key to resolve: the path, or the path minus its last segment
    pub method_name: String,
    /// Trailing segment removed from the path, percent-decoded
    pub path_param: Option<String>,
    pub query_params: QueryVec,
    /// Body decoded as text using the declared charset
    pub body: String,
}

impl ParsedRequest {
    /// Query value for `name`
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a `Cookie` header value into name/value pairs
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse a query string, keeping the order of first appearance.
///
/// A repeated name keeps its first position and takes the last value.
pub fn parse_query_params(query: &str) -> QueryVec {
    let mut out = QueryVec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        match out.iter_mut().find(|(name, _)| *name == k) {
            Some(slot) => slot.1 = v.into_owned(),
            None => out.push((k.into_owned(), v.into_owned())),
        }
    }
    out
}

/// Split `path` into the part before its last `/` and the last segment.
///
/// Works on the segment boundary, so a segment text that also occurs earlier in the path
/// is never confused with the trailing one.
fn split_last_segment(path: &str) -> (String, Option<String>) {
    let Some(idx) = path.rfind('/') else {
        return (path.to_string(), None);
    };
    let last = &path[idx + 1..];
    if last.is_empty() {
        return (path.to_string(), None);
    }
    let head = if idx == 0 { "/" } else { &path[..idx] };
    let param = urlencoding::decode(last)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| last.to_string());
    (head.to_string(), Some(param))
}

/// Decode body bytes with the charset from `content_type`.
///
/// `iso-8859-1`/`latin1` map bytes one-to-one onto code points. UTF-8 and US-ASCII, or no
/// charset at all, decode as UTF-8 with invalid sequences replaced. Any other charset is
/// logged and decoded as UTF-8 the same way.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let charset = content_type.and_then(|ct| {
        ct.split(';').skip(1).find_map(|p| {
            let (k, v) = p.trim().split_once('=')?;
            k.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| v.trim().trim_matches('"').to_ascii_lowercase())
        })
    });
    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1") => body.iter().map(|&b| char::from(b)).collect(),
        None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => {
            String::from_utf8_lossy(body).into_owned()
        }
        Some(other) => {
            debug!(charset = %other, "Unrecognised body charset, decoding as UTF-8");
            String::from_utf8_lossy(body).into_owned()
        }
    }
}

/// Extract routing facts from `raw`.
///
/// An exact registry hit keeps the full path as the method name. Otherwise the last path
/// segment becomes the single positional path parameter; only one level is tried.
pub fn parse_request(raw: &RawRequest, registry: &RouteRegistry) -> ParsedRequest {
    let path = raw.path();
    let (method_name, path_param) = if registry.contains(path) {
        (path.to_string(), None)
    } else {
        split_last_segment(path)
    };

    let query_params = raw.query().map(parse_query_params).unwrap_or_default();
    let body = if raw.body.is_empty() {
        String::new()
    } else {
        decode_body(&raw.body, raw.content_type())
    };

    debug!(
        method_name = %method_name,
        has_path_param = path_param.is_some(),
        query_count = query_params.len(),
        body_len = body.len(),
        "request parsed"
    );

    ParsedRequest {
        method_name,
        path_param,
        query_params,
        body,
    }
}
