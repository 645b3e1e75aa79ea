//! # Dispatcher Module
//!
//! Turns a resolved route plus the parsed request into a handler call.
//!
//! ## Overview
//!
//! Dispatch happens in two steps:
//!
//! 1. **Binding**: [`bind_args`] fills the route's declared parameters from the path
//!    parameter, the query string and the body. Binding is all-or-nothing; any failure is
//!    a `400 Bad Request` and the handler never runs.
//! 2. **Invocation**: [`dispatch`] calls the handler with an explicit
//!    [`HandlerContext`](crate::context::HandlerContext). The call is the one supervisory
//!    boundary around user code: errors and panics both become `500`.
//!
//! ## Body binding
//!
//! A body bound to a parameter is decoded as JSON when the request's content type is
//! `application/json` or a `+json` type; structured parameters are then checked against
//! their target type. Any other body is taken as text and converted like a query value.

mod binding;
mod core;

pub use binding::{bind_args, is_json_media_type};
pub use core::dispatch;
