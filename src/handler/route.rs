use super::params::{Args, ParamSpec};
use crate::context::HandlerContext;
use crate::principal::ANONYMOUS_ROLE;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Verbs a route may be declared for
pub const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::TRACE,
];

/// Handler body. Writes its reply through the context; an `Err` becomes a 500.
pub type HandlerFn =
    Arc<dyn Fn(&mut HandlerContext<'_>, &Args) -> anyhow::Result<()> + Send + Sync>;

/// Error raised while declaring a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Verb outside [`SUPPORTED_METHODS`]
    UnsupportedVerb(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::UnsupportedVerb(v) => write!(
                f,
                "unsupported verb '{v}' (expected one of GET, POST, PUT, DELETE, HEAD, TRACE)"
            ),
        }
    }
}

impl std::error::Error for RouteError {}

/// Parse a declared verb name into an [`http::Method`]
pub fn parse_verb(verb: &str) -> Result<Method, RouteError> {
    let upper = verb.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| RouteError::UnsupportedVerb(verb.to_string()))
}

/// Static description of one route
#[derive(Debug, Clone)]
pub struct RouteMeta {
    /// Routing key matched against the request path with its last segment removed
    pub path: String,
    pub method: Method,
    /// Role the principal must hold; `"Anonymous"` unless declared otherwise
    pub required_role: String,
    /// Name used in logs and the route listing
    pub handler_name: String,
    pub params: Vec<ParamSpec>,
}

/// A route declaration together with its handler
pub struct Route {
    meta: RouteMeta,
    handler: HandlerFn,
}

impl Route {
    /// Start declaring a route for `method` at `path`
    pub fn builder(method: Method, path: impl Into<String>) -> RouteBuilder {
        let path = normalize_path(path.into());
        RouteBuilder {
            meta: RouteMeta {
                handler_name: default_handler_name(&path),
                path,
                method,
                required_role: ANONYMOUS_ROLE.to_string(),
                params: Vec::new(),
            },
        }
    }

    /// Like [`Route::builder`] with the verb given by name
    pub fn with_verb(verb: &str, path: impl Into<String>) -> Result<RouteBuilder, RouteError> {
        Ok(Self::builder(parse_verb(verb)?, path))
    }

    pub fn get(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::HEAD, path)
    }

    pub fn trace(path: impl Into<String>) -> RouteBuilder {
        Self::builder(Method::TRACE, path)
    }

    #[must_use]
    pub fn meta(&self) -> &RouteMeta {
        &self.meta
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.meta.path
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.meta.method
    }

    #[must_use]
    pub fn required_role(&self) -> &str {
        &self.meta.required_role
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.meta.handler_name
    }

    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.meta.params
    }

    pub(crate) fn invoke(&self, ctx: &mut HandlerContext<'_>, args: &Args) -> anyhow::Result<()> {
        (self.handler)(ctx, args)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Builder returned by the [`Route`] constructors
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    meta: RouteMeta,
}

impl RouteBuilder {
    /// Require `role` to reach this route
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.meta.required_role = role.into();
        self
    }

    /// Override the handler name shown in logs
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.meta.handler_name = name.into();
        self
    }

    /// Append a parameter; binding follows declaration order
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.meta.params.push(spec);
        self
    }

    #[must_use]
    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.meta.params.extend(specs);
        self
    }

    /// Finish the declaration with its handler body
    pub fn handler<F>(self, f: F) -> Route
    where
        F: Fn(&mut HandlerContext<'_>, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Route {
            meta: self.meta,
            handler: Arc::new(f),
        }
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn default_handler_name(path: &str) -> String {
    let name: String = path
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        "root".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verb() {
        assert_eq!(parse_verb("GET").unwrap(), Method::GET);
        assert_eq!(parse_verb("delete").unwrap(), Method::DELETE);
        assert_eq!(
            parse_verb("PATCH"),
            Err(RouteError::UnsupportedVerb("PATCH".into()))
        );
        assert!(parse_verb("OPTIONS").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let route = Route::get("api/Item").handler(|_, _| Ok(()));
        assert_eq!(route.path(), "/api/Item");
        assert_eq!(route.required_role(), ANONYMOUS_ROLE);
        assert_eq!(route.handler_name(), "api_Item");
        assert!(route.params().is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let route = Route::with_verb("post", "/Item")
            .unwrap()
            .role("Admin")
            .named("create_item")
            .param(ParamSpec::int("id"))
            .handler(|_, _| Ok(()));
        assert_eq!(route.method(), &Method::POST);
        assert_eq!(route.required_role(), "Admin");
        assert_eq!(route.handler_name(), "create_item");
        assert_eq!(route.params().len(), 1);
    }
}
