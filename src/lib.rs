//! # ctlrouter
//!
//! **ctlrouter** is a small, coroutine-powered controller router. Handler groups declare their
//! routes (path, verb, required role, parameters) up front; ctlrouter authenticates every
//! request, resolves it to a route, checks the caller's role, binds the handler arguments from
//! the path, query string and body, and turns whatever happens into exactly one HTTP response.
//!
//! ## Architecture
//!
//! - **[`handler`]** - route declarations, parameter descriptors and handler groups
//! - **[`router`]** - the path → group registry and route resolution with role checks
//! - **[`security`]** - credential stores, authentication schemes and the authenticator
//! - **[`dispatcher`]** - argument binding and supervised handler invocation
//! - **[`server`]** - request parsing, the per-request pipeline, listeners and lifecycle
//! - **[`context`]** - the explicit per-call context handed to handlers
//! - **[`cors`]** - CORS headers and OPTIONS preflight answers
//! - **[`worker_pool`]** - `may` coroutines running one request each
//! - **[`config`]**, **[`runtime_config`]**, **[`logging`]** - configuration and tracing setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Listener as HttpServer<br/>(tiny_http IO thread)
//!     participant Worker as Worker<br/>(may coroutine)
//!     participant Auth as Authenticator
//!     participant Router as Router
//!     participant Dispatch as Dispatcher
//!     participant Handler as Handler
//!
//!     Client->>Listener: GET /RemoveItem/42
//!     Listener->>Worker: queue RawRequest (body already read)
//!     Worker->>Auth: authenticate(cookie / basic / key)
//!     Auth-->>Worker: Principal (or anonymous)
//!     alt OPTIONS
//!         Worker-->>Client: 200 + CORS preflight headers
//!     end
//!     Worker->>Router: resolve("/RemoveItem", DELETE, principal)
//!     alt no group / route / verb
//!         Router-->>Client: 404 Not Found
//!     end
//!     alt role not held
//!         Router-->>Client: 401 Unauthorized
//!     end
//!     Worker->>Dispatch: bind args [path "42", query..., body]
//!     alt argument cannot be converted
//!         Dispatch-->>Client: 400 Bad Request
//!     end
//!     Dispatch->>Handler: handler(ctx, args)
//!     alt Err or panic
//!         Dispatch-->>Client: 500 Internal Server Error
//!     end
//!     Handler-->>Client: response written by the handler
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctlrouter::{HandlerGroup, ParamSpec, Route, Server, ServerConfig};
//! use ctlrouter::security::NoCredentialStore;
//! use std::sync::Arc;
//!
//! let items = HandlerGroup::new("items")
//!     .route(Route::get("/items").handler(|ctx, _| ctx.ok_json(&["a", "b"])))
//!     .route(
//!         Route::delete("/items/remove")
//!             .role("Admin")
//!             .param(ParamSpec::int("id"))
//!             .handler(|ctx, args| {
//!                 let id: i64 = args.get("id")?;
//!                 ctx.ok_text(format!("removed {id}"));
//!                 Ok(())
//!             }),
//!     );
//!
//! let mut server = Server::new(ServerConfig::default(), Arc::new(NoCredentialStore));
//! server.add_group(items);
//! server.start()?;
//! ```
//!
//! ## Runtime Tuning
//!
//! Every request runs on a worker coroutine whose stack is fixed at spawn time. Size it with
//! `workers.stack_size` in the configuration or `CTLR_STACK_SIZE` for the deepest handler;
//! see [`runtime_config`].

pub mod cli;
pub mod config;
pub mod context;
pub mod cors;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod principal;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod worker_pool;

pub use config::ServerConfig;
pub use context::HandlerContext;
pub use error::DispatchError;
pub use handler::{Args, HandlerGroup, ParamKind, ParamSource, ParamSpec, Route, RouteMeta};
pub use principal::Principal;
pub use security::{AuthScheme, CredentialStore, SecurityProvider, SecurityRequest};
pub use server::{Server, ServerError, ServerState};
