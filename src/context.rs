//! # Handler Context
//!
//! [`HandlerContext`] is the explicit per-call context every handler receives. It holds the
//! resolved [`Principal`], the raw request, the request id, the owning group's credential
//! store and the response under construction.
//!
//! A context is created by the dispatcher for exactly one handler call and consumed when
//! the response is produced. It is never shared between requests, so a worker that picks
//! up the next request starts from a fresh context.
//!
//! ## Writing responses
//!
//! The status starts as `200 OK`. Status helpers ([`HandlerContext::created`],
//! [`HandlerContext::forbidden`], ...) only change the status. Writers set the body and
//! content headers:
//!
//! - [`HandlerContext::ok_bytes`] writes raw bytes with an explicit content type and
//!   encoding and leaves the status alone.
//! - [`HandlerContext::ok_text`] / [`HandlerContext::ok_text_with`] write text and force
//!   `200`.
//! - [`HandlerContext::ok_json`] serializes a value with `serde_json` and forces `200`.

use crate::ids::RequestId;
use crate::principal::Principal;
use crate::security::CredentialStore;
use crate::server::{Cookie, HttpResponse, RawRequest};
use http::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-call view of the request and the response being built
pub struct HandlerContext<'a> {
    principal: &'a Principal,
    request: &'a RawRequest,
    request_id: RequestId,
    cookies: HashMap<String, String>,
    credential_store: Option<&'a Arc<dyn CredentialStore>>,
    response: HttpResponse,
}

impl<'a> HandlerContext<'a> {
    pub fn new(principal: &'a Principal, request: &'a RawRequest, request_id: RequestId) -> Self {
        Self {
            principal,
            request,
            request_id,
            cookies: request.cookies(),
            credential_store: None,
            response: HttpResponse::default(),
        }
    }

    #[must_use]
    pub fn with_credential_store(mut self, store: Option<&'a Arc<dyn CredentialStore>>) -> Self {
        self.credential_store = store;
        self
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        self.principal
    }

    #[must_use]
    pub fn request(&self) -> &RawRequest {
        self.request
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Request header (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    /// Cookies sent with the request
    #[must_use]
    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Credential store of the group serving this request
    #[must_use]
    pub fn credential_store(&self) -> Option<&dyn CredentialStore> {
        self.credential_store.map(|s| s.as_ref())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    pub fn ok(&mut self) {
        self.set_status(StatusCode::OK);
    }

    pub fn created(&mut self) {
        self.set_status(StatusCode::CREATED);
    }

    pub fn accepted(&mut self) {
        self.set_status(StatusCode::ACCEPTED);
    }

    pub fn not_modified(&mut self) {
        self.set_status(StatusCode::NOT_MODIFIED);
    }

    pub fn bad_request(&mut self) {
        self.set_status(StatusCode::BAD_REQUEST);
    }

    pub fn not_authenticated(&mut self) {
        self.set_status(StatusCode::UNAUTHORIZED);
    }

    pub fn forbidden(&mut self) {
        self.set_status(StatusCode::FORBIDDEN);
    }

    pub fn not_found(&mut self) {
        self.set_status(StatusCode::NOT_FOUND);
    }

    pub fn method_not_allowed(&mut self) {
        self.set_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    pub fn not_acceptable(&mut self) {
        self.set_status(StatusCode::NOT_ACCEPTABLE);
    }

    pub fn request_timeout(&mut self) {
        self.set_status(StatusCode::REQUEST_TIMEOUT);
    }

    pub fn internal_error(&mut self) {
        self.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    pub fn not_implemented(&mut self) {
        self.set_status(StatusCode::NOT_IMPLEMENTED);
    }

    pub fn service_unavailable(&mut self) {
        self.set_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    /// Write raw bytes as the body; the status is left unchanged
    pub fn ok_bytes(&mut self, data: impl Into<Vec<u8>>, content_type: &str, content_encoding: &str) {
        self.response.set_header("Content-Type", content_type);
        self.response.set_header("Content-Encoding", content_encoding);
        self.response.body = data.into();
    }

    /// Write `text` as `text/plain` with status 200
    pub fn ok_text(&mut self, text: impl Into<String>) {
        self.ok_text_with(text, "text/plain", "identity");
    }

    pub fn ok_text_with(&mut self, text: impl Into<String>, content_type: &str, content_encoding: &str) {
        self.ok();
        self.ok_bytes(text.into().into_bytes(), content_type, content_encoding);
    }

    /// Serialize `value` as the JSON body with status 200
    pub fn ok_json<T: Serialize + ?Sized>(&mut self, value: &T) -> anyhow::Result<()> {
        let data = serde_json::to_vec(value)?;
        self.ok();
        self.ok_bytes(data, "application/json; charset=utf-8", "identity");
        Ok(())
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.response.cookies.push(cookie);
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.response.set_header(name, value);
    }

    /// Finish the call and take the response
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_to_ok_without_body() {
        let p = Principal::anonymous();
        let req = RawRequest::new("GET", "/");
        let ctx = HandlerContext::new(&p, &req, RequestId::generate());
        let resp = ctx.into_response();
        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_ok_json_forces_ok() {
        let p = Principal::anonymous();
        let req = RawRequest::new("GET", "/");
        let mut ctx = HandlerContext::new(&p, &req, RequestId::generate());
        ctx.created();
        ctx.ok_json(&json!({"id": 0, "name": "_"})).unwrap();
        let resp = ctx.into_response();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            resp.header("content-type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(resp.body, br#"{"id":0,"name":"_"}"#);
    }

    #[test]
    fn test_ok_bytes_keeps_status() {
        let p = Principal::anonymous();
        let req = RawRequest::new("GET", "/");
        let mut ctx = HandlerContext::new(&p, &req, RequestId::generate());
        ctx.created();
        ctx.ok_bytes(vec![1, 2, 3], "application/octet-stream", "identity");
        let resp = ctx.into_response();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.header("content-encoding"), Some("identity"));
    }

    #[test]
    fn test_cookies_in_and_out() {
        let p = Principal::anonymous();
        let req = RawRequest::new("GET", "/").with_header("Cookie", "a=1; b=2");
        let mut ctx = HandlerContext::new(&p, &req, RequestId::generate());
        assert_eq!(ctx.cookie("b"), Some("2"));
        assert_eq!(ctx.cookies().len(), 2);
        ctx.set_cookie(Cookie::new("mycookie", "1234567890"));
        let resp = ctx.into_response();
        assert_eq!(resp.cookies.len(), 1);
    }
}
