use crate::handler::{HandlerGroup, RouteMeta};
use http::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do when two groups declare routes under the same path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep the first group, warn, and record the later group's routes as shadowed
    #[default]
    FirstWins,
    /// Refuse to build the registry
    Reject,
}

/// A route made unreachable because an earlier group owns its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedRoute {
    pub path: String,
    pub method: Method,
    /// Group that declared the unreachable route
    pub group: String,
    /// Group that owns the path
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two groups declare the same path under [`CollisionPolicy::Reject`]
    PathCollision {
        path: String,
        first_group: String,
        second_group: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::PathCollision {
                path,
                first_group,
                second_group,
            } => write!(
                f,
                "path {path} is declared by both '{first_group}' and '{second_group}'"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Index from route path to the one group that owns it.
///
/// Built once before the listener starts and read-only afterwards, so request workers
/// share it through an `Arc` without locking.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    groups: Vec<Arc<HandlerGroup>>,
    index: HashMap<String, usize>,
    shadowed: Vec<ShadowedRoute>,
}

impl RouteRegistry {
    /// Bind every path to the first group that declares it
    pub fn build<I>(groups: I, policy: CollisionPolicy) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Arc<HandlerGroup>>,
    {
        let groups: Vec<Arc<HandlerGroup>> = groups.into_iter().collect();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut shadowed = Vec::new();

        for (gi, group) in groups.iter().enumerate() {
            for path in group.paths() {
                match index.get(path) {
                    None => {
                        index.insert(path.to_string(), gi);
                    }
                    Some(&owner) if owner == gi => {}
                    Some(&owner) => {
                        let owner_name = groups[owner].name();
                        if policy == CollisionPolicy::Reject {
                            return Err(RegistryError::PathCollision {
                                path: path.to_string(),
                                first_group: owner_name.to_string(),
                                second_group: group.name().to_string(),
                            });
                        }
                        warn!(
                            path = %path,
                            owner = %owner_name,
                            group = %group.name(),
                            "path already owned by an earlier group; routes shadowed"
                        );
                        shadowed.extend(group.routes().iter().filter(|r| r.path() == path).map(
                            |r| ShadowedRoute {
                                path: path.to_string(),
                                method: r.method().clone(),
                                group: group.name().to_string(),
                                owner: owner_name.to_string(),
                            },
                        ));
                    }
                }
            }
        }

        debug!(
            groups = groups.len(),
            paths = index.len(),
            shadowed = shadowed.len(),
            "route registry built"
        );

        Ok(Self {
            groups,
            index,
            shadowed,
        })
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Group owning `path`
    #[must_use]
    pub fn group_for(&self, path: &str) -> Option<&Arc<HandlerGroup>> {
        self.index.get(path).map(|&i| &self.groups[i])
    }

    #[must_use]
    pub fn groups(&self) -> &[Arc<HandlerGroup>] {
        &self.groups
    }

    /// Routes dropped by [`CollisionPolicy::FirstWins`]
    #[must_use]
    pub fn shadowed(&self) -> &[ShadowedRoute] {
        &self.shadowed
    }

    /// Number of registered paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Reachable routes as `(group, route)` pairs, in registration order
    pub fn route_table(&self) -> Vec<(&str, &RouteMeta)> {
        let mut out = Vec::new();
        for (gi, group) in self.groups.iter().enumerate() {
            for route in group.routes() {
                if self.index.get(route.path()) == Some(&gi) {
                    out.push((group.name(), route.meta()));
                }
            }
        }
        out
    }
}
