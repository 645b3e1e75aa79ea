//! # Server Module
//!
//! HTTP side of the router: request and response types, the per-request pipeline and the
//! listener lifecycle.
//!
//! ## Request Lifecycle
//!
//! 1. An IO thread takes a request from `tiny_http`, reads its body into a [`RawRequest`] and
//!    queues it for a worker coroutine ([`crate::worker_pool`])
//! 2. The worker calls [`AppService::handle`] and sends the response back to the IO thread
//! 3. The [`Authenticator`](crate::security::Authenticator) produces a principal
//! 4. `OPTIONS` is answered with the CORS preflight and never reaches a handler
//! 5. [`parse_request`] splits the path into method name and path parameter
//! 6. The [`Router`](crate::router::Router) resolves the route and checks its role
//! 7. The [`dispatcher`](crate::dispatcher) binds arguments and invokes the handler
//! 8. CORS and `x-request-id` headers are added and the IO thread writes the response
//!
//! ## Error Responses
//!
//! | Failure | Status | Body |
//! |---|---|---|
//! | no group, no route or verb mismatch | 404 | `{"error": ...}` |
//! | role not held | 401 | empty, `WWW-Authenticate` for Basic |
//! | argument cannot be bound | 400 | `{"error": ...}` |
//! | handler error or panic | 500 | `{"error": ...}` |

mod http_server;
mod request;
mod response;
#[allow(clippy::module_inception)]
mod server;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{
    decode_body, parse_cookies, parse_query_params, parse_request, HeaderVec, ParsedRequest,
    QueryVec, RawRequest,
};
pub use response::{Cookie, HttpResponse};
pub use server::{Server, ServerError, ServerState};
pub use service::AppService;
