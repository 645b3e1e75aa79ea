use super::request::{parse_request, RawRequest};
use super::response::HttpResponse;
use crate::context::HandlerContext;
use crate::cors::CorsPolicy;
use crate::dispatcher::dispatch;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::principal::Principal;
use crate::router::Router;
use crate::security::Authenticator;
use http::{Method, StatusCode};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, info_span};

/// The per-request pipeline, independent of the listener.
///
/// `handle` runs authenticate → CORS/OPTIONS → parse → resolve → dispatch and always
/// returns exactly one response. Cloning is cheap; every worker holds a clone.
#[derive(Clone)]
pub struct AppService {
    router: Router,
    authenticator: Arc<Authenticator>,
    cors: Arc<CorsPolicy>,
}

impl AppService {
    pub fn new(router: Router, authenticator: Authenticator, cors: CorsPolicy) -> Self {
        Self {
            router,
            authenticator: Arc::new(authenticator),
            cors: Arc::new(cors),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run the full pipeline for one request
    pub fn handle(&self, raw: &RawRequest) -> HttpResponse {
        let request_id = RequestId::for_request(raw);
        let span = info_span!(
            "request",
            request_id = %request_id,
            inherited_id = request_id.is_inherited(),
            method = %raw.method,
            path = %raw.path()
        );
        let _enter = span.enter();

        let principal = self.authenticator.authenticate(raw);
        let origin = raw.header("origin");

        let mut resp = if raw.method.eq_ignore_ascii_case("OPTIONS") {
            debug!("answering OPTIONS preflight");
            self.cors.preflight(origin)
        } else {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.route(raw, &principal, request_id)));
            let mut resp = outcome.unwrap_or_else(|_| {
                error!("request pipeline panicked");
                self.error_response(&DispatchError::Internal("request pipeline failed".into()))
            });
            self.cors.apply(origin, &mut resp);
            resp
        };

        request_id.stamp(&mut resp);
        debug!(
            status = resp.status.as_u16(),
            body_len = resp.body.len(),
            "response ready"
        );
        resp
    }

    fn route(&self, raw: &RawRequest, principal: &Principal, request_id: RequestId) -> HttpResponse {
        let Ok(method) = Method::from_bytes(raw.method.as_bytes()) else {
            return self.error_response(&DispatchError::bad_request(format!(
                "invalid method '{}'",
                raw.method
            )));
        };

        let parsed = parse_request(raw, self.router.registry());
        let resolved = match self.router.resolve(&parsed.method_name, &method, principal) {
            Ok(r) => r,
            Err(e) => {
                info!(
                    method_name = %parsed.method_name,
                    principal = %principal.name(),
                    error = %e,
                    "route resolution failed"
                );
                return self.error_response(&e);
            }
        };

        let ctx = HandlerContext::new(principal, raw, request_id)
            .with_credential_store(resolved.group.credential_store());
        match dispatch(&resolved.route, &parsed, ctx) {
            Ok(resp) => resp,
            Err(e) => self.error_response(&e),
        }
    }

    /// Map a pipeline failure to its response.
    ///
    /// `401` carries no body, only the scheme's challenge if it has one; other failures
    /// carry `{"error": ...}`.
    fn error_response(&self, e: &DispatchError) -> HttpResponse {
        let status = e.status();
        if status == StatusCode::UNAUTHORIZED {
            let mut resp = HttpResponse::new(status);
            if let Some(challenge) = self.authenticator.challenge() {
                resp.set_header("WWW-Authenticate", challenge);
            }
            return resp;
        }
        HttpResponse::json_error(status, e)
    }
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService")
            .field("paths", &self.router.registry().len())
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}
