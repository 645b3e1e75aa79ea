//! # Router Module
//!
//! Route resolution for ctlrouter. Routing is a two-phase process:
//!
//! 1. **Registration**: at startup, [`RouteRegistry::build`] walks the registered
//!    [`HandlerGroup`](crate::handler::HandlerGroup)s and binds every declared path to the
//!    first group that declares it. The registry is immutable afterwards.
//!
//! 2. **Resolution**: for each request, [`Router::resolve`] looks up the group owning the
//!    method name, scans its routes in declaration order for the first one whose path and
//!    verb match, and checks the principal's role against the route's required role.
//!
//! ## Collisions
//!
//! A path belongs to exactly one group. When a later group declares a path that is already
//! owned, [`CollisionPolicy`] decides: `FirstWins` keeps the earlier group and records the
//! later routes in [`RouteRegistry::shadowed`]; `Reject` fails the build.
//!
//! ## Example
//!
//! ```rust,ignore
//! let registry = RouteRegistry::build(groups, CollisionPolicy::FirstWins)?;
//! let router = Router::new(registry);
//! let resolved = router.resolve("/RemoveItem", &Method::DELETE, &principal)?;
//! ```

mod core;
mod registry;

pub use core::{Resolved, Router};
pub use registry::{CollisionPolicy, RegistryError, RouteRegistry, ShadowedRoute};
