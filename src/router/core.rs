use super::registry::RouteRegistry;
use crate::error::DispatchError;
use crate::handler::{HandlerGroup, Route};
use crate::principal::Principal;
use http::Method;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a successful resolution: the route to run and the group that owns it
#[derive(Debug, Clone)]
pub struct Resolved {
    pub group: Arc<HandlerGroup>,
    pub route: Arc<Route>,
}

/// Resolves `(method name, verb, principal)` against a built [`RouteRegistry`].
///
/// Cheap to clone; all clones share the same registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<RouteRegistry>,
}

impl Router {
    #[must_use]
    pub fn new(registry: RouteRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Find the route for `method_name` and `method`, then check the principal's role.
    ///
    /// The first route in declaration order whose path and verb match is the only
    /// candidate; if the principal lacks its role the result is `Unauthorized` even when a
    /// later route would have matched.
    pub fn resolve(
        &self,
        method_name: &str,
        method: &Method,
        principal: &Principal,
    ) -> Result<Resolved, DispatchError> {
        let not_found = || DispatchError::NotFound {
            path: method_name.to_string(),
            method: method.as_str().to_string(),
        };

        let group = self.registry.group_for(method_name).ok_or_else(not_found)?;
        let route = group.find(method_name, method).ok_or_else(not_found)?;

        if !principal.has_role(route.required_role()) {
            debug!(
                path = %method_name,
                required_role = %route.required_role(),
                principal = %principal.name(),
                "principal lacks required role"
            );
            return Err(DispatchError::Unauthorized {
                path: method_name.to_string(),
                required_role: route.required_role().to_string(),
            });
        }

        Ok(Resolved {
            group: Arc::clone(group),
            route: Arc::clone(route),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::CollisionPolicy;

    fn router() -> Router {
        let group = HandlerGroup::new("sample")
            .route(Route::get("/MyMethod").handler(|_, _| Ok(())))
            .route(
                Route::get("/AdminMethod")
                    .role("Admin")
                    .handler(|_, _| Ok(())),
            );
        Router::new(
            RouteRegistry::build([Arc::new(group)], CollisionPolicy::FirstWins).unwrap(),
        )
    }

    #[test]
    fn test_resolve_anonymous_route() {
        let r = router();
        let resolved = r
            .resolve("/MyMethod", &Method::GET, &Principal::anonymous())
            .unwrap();
        assert_eq!(resolved.route.path(), "/MyMethod");
        assert_eq!(resolved.group.name(), "sample");
    }

    #[test]
    fn test_resolve_failures() {
        let r = router();
        let anon = Principal::anonymous();
        assert!(matches!(
            r.resolve("/nope", &Method::GET, &anon),
            Err(DispatchError::NotFound { .. })
        ));
        assert!(matches!(
            r.resolve("/MyMethod", &Method::POST, &anon),
            Err(DispatchError::NotFound { .. })
        ));
        assert!(matches!(
            r.resolve("/AdminMethod", &Method::GET, &anon),
            Err(DispatchError::Unauthorized { .. })
        ));
        let admin = Principal::authenticated("root", ["Admin"]);
        assert!(r.resolve("/AdminMethod", &Method::GET, &admin).is_ok());
    }
}
