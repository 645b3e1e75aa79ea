//! Built-in diagnostic handler group served by `ctlrouter serve`.
//!
//! | Path | Verb | Response |
//! |---|---|---|
//! | `/health` | GET | `{"status": "ok"}` |
//! | `/echo?msg=...` | GET | the `msg` query value as text (empty when absent) |
//! | `/echo/<msg>` | GET | same, with the message taken from the last path segment |
//! | `/whoami` | GET | the caller's principal as JSON |

use crate::handler::{HandlerGroup, ParamSpec, Route};
use serde_json::json;

/// Name of the group returned by [`echo_group`]
pub const ECHO_GROUP: &str = "echo";

#[must_use]
pub fn echo_group() -> HandlerGroup {
    HandlerGroup::new(ECHO_GROUP)
        .route(Route::get("/health").named("health").handler(|ctx, _| {
            ctx.ok_json(&json!({ "status": "ok" }))
        }))
        .route(
            Route::get("/echo")
                .named("echo")
                .param(ParamSpec::text("msg").optional())
                .handler(|ctx, args| {
                    let msg: Option<String> = args.opt("msg")?;
                    ctx.ok_text(msg.unwrap_or_default());
                    Ok(())
                }),
        )
        .route(Route::get("/whoami").named("whoami").handler(|ctx, _| {
            let principal = ctx.principal();
            let body = json!({
                "name": principal.name(),
                "roles": principal.roles(),
                "authenticated": principal.is_authenticated(),
                "request_id": ctx.request_id(),
            });
            ctx.ok_json(&body)
        }))
}
