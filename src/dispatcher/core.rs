use super::binding::bind_args;
use crate::context::HandlerContext;
use crate::error::DispatchError;
use crate::handler::Route;
use crate::server::{HttpResponse, ParsedRequest};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Bind arguments for `route` and run its handler.
///
/// Binding happens before the handler is entered, so a binding failure has no handler
/// side effects. The handler runs inside `catch_unwind`: an `Err` return and a panic both
/// become [`DispatchError::Internal`], and whatever the handler wrote to the context is
/// dropped.
pub fn dispatch(
    route: &Route,
    parsed: &ParsedRequest,
    mut ctx: HandlerContext<'_>,
) -> Result<HttpResponse, DispatchError> {
    let handler_name = route.handler_name();
    let request_id = ctx.request_id();

    let args = bind_args(route.params(), parsed, ctx.request().content_type()).map_err(|e| {
        info!(
            request_id = %request_id,
            handler_name = %handler_name,
            error = %e,
            "parameter binding failed"
        );
        e
    })?;

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| route.invoke(&mut ctx, &args)));
    let elapsed_us = start.elapsed().as_micros() as u64;

    match outcome {
        Ok(Ok(())) => {
            debug!(
                request_id = %request_id,
                handler_name = %handler_name,
                status = ctx.status().as_u16(),
                elapsed_us,
                "handler complete"
            );
            Ok(ctx.into_response())
        }
        Ok(Err(e)) => {
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                error = %e,
                elapsed_us,
                "handler returned an error"
            );
            Err(DispatchError::Internal(e.to_string()))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                panic_message = %message,
                elapsed_us,
                "handler panicked"
            );
            Err(DispatchError::Internal(format!("handler panicked: {message}")))
        }
    }
}
