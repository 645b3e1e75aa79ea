//! # Handler Module
//!
//! Declarative route tables. A [`HandlerGroup`] is a named list of [`Route`]s; each route
//! carries a [`RouteMeta`] (path, verb, required role, parameter descriptors) and a handler
//! closure. Groups are registered with the server, which builds the path registry from them.
//!
//! ## Parameters
//!
//! Parameters are described with [`ParamSpec`] and bound by the dispatcher into [`Args`]
//! before the handler runs. By default a parameter is *positional*: the first parameter may
//! take the trailing path segment, the following ones take query values by name, and a
//! parameter with no other source takes the whole body.
//!
//! ```ignore
//! let group = HandlerGroup::new("items")
//!     .route(
//!         Route::get("/Item")
//!             .param(ParamSpec::int("id"))
//!             .handler(|ctx, args| {
//!                 let id: i64 = args.get("id")?;
//!                 ctx.ok_json(&serde_json::json!({ "id": id }));
//!                 Ok(())
//!             }),
//!     );
//! ```

mod group;
mod params;
mod route;

pub use group::HandlerGroup;
pub use params::{Args, JsonCheck, ParamKind, ParamSource, ParamSpec};
pub use route::{parse_verb, HandlerFn, Route, RouteBuilder, RouteError, RouteMeta, SUPPORTED_METHODS};
