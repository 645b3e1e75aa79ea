use super::route::Route;
use crate::security::CredentialStore;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// A named set of routes sharing one credential store.
///
/// Routes keep their declaration order; when two routes in a group share a path and verb,
/// the first one declared wins.
pub struct HandlerGroup {
    name: String,
    routes: Vec<Arc<Route>>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl HandlerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            store: None,
        }
    }

    /// Builder-style [`HandlerGroup::add_route`]
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.add_route(route);
        self
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(Arc::new(route));
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Credential store attached when the group was registered with a server
    #[must_use]
    pub fn credential_store(&self) -> Option<&Arc<dyn CredentialStore>> {
        self.store.as_ref()
    }

    pub(crate) fn attach_credential_store(&mut self, store: Arc<dyn CredentialStore>) {
        self.store = Some(store);
    }

    /// First route matching `path` and `method`, in declaration order
    #[must_use]
    pub fn find(&self, path: &str, method: &Method) -> Option<&Arc<Route>> {
        self.routes
            .iter()
            .find(|r| r.path() == path && r.method() == method)
    }

    /// Distinct route paths, in declaration order
    pub fn paths(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            if !out.contains(&route.path()) {
                out.push(route.path());
            }
        }
        out
    }
}

impl fmt::Debug for HandlerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerGroup")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}
